//! Partial evaluation of constraint expressions.
//!
//! [`eval`] returns `Ok(None)` while any operand it needs is still symbolic.
//! Boolean `and`/`or`/`implies` and the `any`/`all` reductions over literal
//! arrays short-circuit on a dominating known operand, so a requirement can
//! be decided before every parameter is assigned.

use crate::expr::{BinaryOp, Expr, ExprNode, ReduceOp, UnaryOp};
use crate::ids::ParamId;
use crate::kind::Kind;
use crate::range::Range;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Source of parameter values.
pub trait Env {
    /// The value of `id`, or `None` while it is symbolic.
    fn lookup(&self, id: ParamId) -> Option<&Value>;
}

impl Env for HashMap<ParamId, Value> {
    fn lookup(&self, id: ParamId) -> Option<&Value> {
        self.get(&id)
    }
}

impl Env for BTreeMap<ParamId, Value> {
    fn lookup(&self, id: ParamId) -> Option<&Value> {
        self.get(&id)
    }
}

/// A value did not have the shape its operator expects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Operand value of the wrong kind, e.g. from a solver returning garbage.
    #[error("`{op}` received {found}")]
    TypeMismatch {
        /// Operator name.
        op: String,
        /// The offending value.
        found: String,
    },

    /// Integer division by zero.
    #[error("integer division by zero")]
    DivisionByZero,

    /// Integer overflow.
    #[error("integer overflow in `{op}`")]
    Overflow {
        /// Operator name.
        op: String,
    },

    /// Elementwise operands of different lengths.
    #[error("elementwise `{op}` on arrays of length {lhs} and {rhs}")]
    LengthMismatch {
        /// Operator name.
        op: String,
        /// Left length.
        lhs: usize,
        /// Right length.
        rhs: usize,
    },
}

fn mismatch(op: impl ToString, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_string(),
        found: found.to_string(),
    }
}

/// Evaluates `expr` against `env`.
pub fn eval(expr: &Expr, env: &dyn Env) -> Result<Option<Value>, EvalError> {
    match &expr.node {
        ExprNode::Literal(v) => Ok(Some(v.clone())),
        ExprNode::Param(id) => Ok(env.lookup(*id).cloned()),
        // Unresolved references stay symbolic; the snapshot resolves all it can.
        ExprNode::LinkParam { .. } => Ok(None),
        ExprNode::Unary { op, operand } => match eval(operand, env)? {
            Some(v) => eval_unary(*op, &v).map(Some),
            None => Ok(None),
        },
        ExprNode::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, env),
        ExprNode::Reduce { op, operand } => eval_reduce(*op, operand, env),
        ExprNode::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match eval(item, env)? {
                    Some(v) => values.push(v),
                    None => return Ok(None),
                }
            }
            Ok(Some(Value::Array(values)))
        }
        ExprNode::IfThenElse {
            cond,
            then,
            otherwise,
        } => match eval(cond, env)? {
            Some(Value::Bool(true)) => eval(then, env),
            Some(Value::Bool(false)) => eval(otherwise, env),
            Some(other) => Err(mismatch("if", &other)),
            None => Ok(None),
        },
    }
}

fn eval_unary(op: UnaryOp, v: &Value) -> Result<Value, EvalError> {
    match (op, v) {
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or(EvalError::Overflow { op: op.to_string() }),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, Value::Range(r)) => Ok(Value::Range(-*r)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Lower, Value::Range(r)) => Ok(Value::Float(r.lower())),
        (UnaryOp::Upper, Value::Range(r)) => Ok(Value::Float(r.upper())),
        (UnaryOp::Center, Value::Range(r)) => Ok(Value::Float(r.center())),
        _ => Err(mismatch(op, v)),
    }
}

fn as_bool(op: BinaryOp, v: &Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| mismatch(op, v))
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &dyn Env) -> Result<Option<Value>, EvalError> {
    let l = eval(lhs, env)?;
    // Boolean connectives decide on one known side where possible.
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Implies => {
            let l = l.map(|v| as_bool(op, &v)).transpose()?;
            let dominant = match op {
                BinaryOp::And => l == Some(false),
                BinaryOp::Or => l == Some(true),
                _ => l == Some(false),
            };
            if dominant {
                return Ok(Some(Value::Bool(op != BinaryOp::And)));
            }
            let r = eval(rhs, env)?.map(|v| as_bool(op, &v)).transpose()?;
            let result = match (op, l, r) {
                (BinaryOp::And, _, Some(false)) => Some(false),
                (BinaryOp::And, Some(a), Some(b)) => Some(a && b),
                (BinaryOp::Or, _, Some(true)) => Some(true),
                (BinaryOp::Or, Some(a), Some(b)) => Some(a || b),
                (BinaryOp::Implies, _, Some(true)) => Some(true),
                (BinaryOp::Implies, Some(a), Some(b)) => Some(!a || b),
                _ => None,
            };
            return Ok(result.map(Value::Bool));
        }
        _ => {}
    }
    let Some(l) = l else { return Ok(None) };
    let Some(r) = eval(rhs, env)? else { return Ok(None) };
    apply_binary(op, &l, &r).map(Some)
}

/// Applies a binary operator to two concrete values.
pub fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    use BinaryOp::*;

    if let (Value::Array(a), Value::Array(b)) = (l, r) {
        if matches!(op, Add | Sub | Mul | Div) {
            if a.len() != b.len() {
                return Err(EvalError::LengthMismatch {
                    op: op.to_string(),
                    lhs: a.len(),
                    rhs: b.len(),
                });
            }
            return a
                .iter()
                .zip(b)
                .map(|(x, y)| apply_binary(op, x, y))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array);
        }
    }

    let bad = || mismatch(op, if l.as_array().is_some() { l } else { r });
    Ok(match (op, l, r) {
        (Add, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_add(*b).ok_or(EvalError::Overflow { op: op.to_string() })?),
        (Sub, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_sub(*b).ok_or(EvalError::Overflow { op: op.to_string() })?),
        (Mul, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_mul(*b).ok_or(EvalError::Overflow { op: op.to_string() })?),
        (Div, Value::Int(_), Value::Int(0)) => return Err(EvalError::DivisionByZero),
        (Div, Value::Int(a), Value::Int(b)) => Value::Int(a.checked_div(*b).ok_or(EvalError::Overflow { op: op.to_string() })?),
        (Add, Value::Float(a), Value::Float(b)) => Value::Float(a + b),
        (Sub, Value::Float(a), Value::Float(b)) => Value::Float(a - b),
        (Mul, Value::Float(a), Value::Float(b)) => Value::Float(a * b),
        (Div, Value::Float(a), Value::Float(b)) => Value::Float(a / b),
        (Add, Value::Range(a), Value::Range(b)) => Value::Range(*a + *b),
        (Sub, Value::Range(a), Value::Range(b)) => Value::Range(*a - *b),
        (Mul, Value::Range(a), Value::Range(b)) => Value::Range(*a * *b),
        (Div, Value::Range(a), Value::Range(b)) => Value::Range(*a / *b),
        (Mul, Value::Range(a), Value::Float(k)) | (Mul, Value::Float(k), Value::Range(a)) => {
            Value::Range(a.scale(*k))
        }
        (Div, Value::Range(a), Value::Float(k)) => Value::Range(*a / Range::exact(*k)),
        (Xor, Value::Bool(a), Value::Bool(b)) => Value::Bool(a != b),
        (Eq, a, b) => Value::Bool(a == b),
        (Ne, a, b) => Value::Bool(a != b),
        (Lt | Le | Gt | Ge, Value::Int(a), Value::Int(b)) => Value::Bool(compare(op, *a as f64, *b as f64)),
        (Lt | Le | Gt | Ge, Value::Float(a), Value::Float(b)) => Value::Bool(compare(op, *a, *b)),
        (Lt | Le, Value::Range(a), Value::Range(b)) => Value::Bool(compare(op, a.upper(), b.lower())),
        (Gt | Ge, Value::Range(a), Value::Range(b)) => Value::Bool(compare(op, a.lower(), b.upper())),
        (Contains, Value::Range(a), Value::Range(b)) => Value::Bool(a.contains(b)),
        (Contains, Value::Range(a), Value::Float(x)) => Value::Bool(a.contains_value(*x)),
        (Hull, Value::Range(a), Value::Range(b)) => Value::Range(a.hull(b)),
        (Intersect, Value::Range(a), Value::Range(b)) => Value::Range(a.intersect(b)),
        (Min, Value::Int(a), Value::Int(b)) => Value::Int(*a.min(b)),
        (Max, Value::Int(a), Value::Int(b)) => Value::Int(*a.max(b)),
        (Min, Value::Float(a), Value::Float(b)) => Value::Float(a.min(*b)),
        (Max, Value::Float(a), Value::Float(b)) => Value::Float(a.max(*b)),
        (Min, Value::Range(a), Value::Range(b)) => Value::Range(a.min(b)),
        (Max, Value::Range(a), Value::Range(b)) => Value::Range(a.max(b)),
        (Bounds, Value::Float(lo), Value::Float(hi)) => {
            Value::Range(Range::try_new(*lo, *hi).unwrap_or(Range::EMPTY))
        }
        (And, Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && *b),
        (Or, Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
        (Implies, Value::Bool(a), Value::Bool(b)) => Value::Bool(!*a || *b),
        _ => return Err(bad()),
    })
}

fn compare(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    }
}

fn eval_reduce(op: ReduceOp, operand: &Expr, env: &dyn Env) -> Result<Option<Value>, EvalError> {
    // Literal arrays can short-circuit any/all with unknown elements.
    if let (ReduceOp::Any | ReduceOp::All, ExprNode::Array(items)) = (op, &operand.node) {
        let target = op == ReduceOp::Any;
        let mut unknown = false;
        for item in items {
            match eval(item, env)? {
                Some(Value::Bool(b)) if b == target => return Ok(Some(Value::Bool(target))),
                Some(Value::Bool(_)) => {}
                Some(other) => return Err(mismatch(op, &other)),
                None => unknown = true,
            }
        }
        return Ok((!unknown).then_some(Value::Bool(!target)));
    }
    let Some(value) = eval(operand, env)? else {
        return Ok(None);
    };
    let items = value.as_array().ok_or_else(|| mismatch(op, &value))?;
    let element = operand.kind.element().ok_or_else(|| mismatch(op, &value))?;
    apply_reduce(op, element, items).map(Some)
}

/// Applies a reduction to concrete elements of kind `element`.
pub fn apply_reduce(op: ReduceOp, element: &Kind, items: &[Value]) -> Result<Value, EvalError> {
    let bools = || -> Result<Vec<bool>, EvalError> {
        items
            .iter()
            .map(|v| v.as_bool().ok_or_else(|| mismatch(op, v)))
            .collect()
    };
    let ranges = || -> Result<Vec<Range>, EvalError> {
        items
            .iter()
            .map(|v| v.as_range().ok_or_else(|| mismatch(op, v)))
            .collect()
    };
    Ok(match op {
        ReduceOp::Sum => match element {
            Kind::Range => Value::Range(ranges()?.into_iter().fold(Range::ZERO, |acc, r| acc + r)),
            Kind::Float => Value::Float(
                items
                    .iter()
                    .map(|v| v.as_float().ok_or_else(|| mismatch(op, v)))
                    .sum::<Result<f64, _>>()?,
            ),
            Kind::Int => {
                let mut acc: i64 = 0;
                for v in items {
                    let i = v.as_int().ok_or_else(|| mismatch(op, v))?;
                    acc = acc
                        .checked_add(i)
                        .ok_or(EvalError::Overflow { op: op.to_string() })?;
                }
                Value::Int(acc)
            }
            other => {
                return Err(EvalError::TypeMismatch {
                    op: op.to_string(),
                    found: format!("array<{other}>"),
                })
            }
        },
        ReduceOp::Any => Value::Bool(bools()?.into_iter().any(|b| b)),
        ReduceOp::All => Value::Bool(bools()?.into_iter().all(|b| b)),
        ReduceOp::Count => Value::Int(bools()?.into_iter().filter(|b| *b).count() as i64),
        ReduceOp::Hull => Value::Range(ranges()?.iter().fold(Range::EMPTY, |acc, r| acc.hull(r))),
        ReduceOp::Intersection => {
            Value::Range(ranges()?.iter().fold(Range::ALL, |acc, r| acc.intersect(r)))
        }
        ReduceOp::Length => Value::Int(items.len() as i64),
        ReduceOp::Flatten => {
            let mut out = Vec::new();
            for v in items {
                out.extend_from_slice(v.as_array().ok_or_else(|| mismatch(op, v))?);
            }
            Value::Array(out)
        }
        ReduceOp::AllUnique => Value::Bool(
            items
                .iter()
                .enumerate()
                .all(|(i, a)| items[i + 1..].iter().all(|b| a != b)),
        ),
    })
}
