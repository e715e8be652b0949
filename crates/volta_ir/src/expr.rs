//! The constraint-expression algebra.
//!
//! An [`Expr`] is an immutable, kind-checked tree over literals, parameters
//! and deferred link references. Builders never mutate their operands; every
//! operation returns a new node, and kind errors surface when the node is
//! built rather than when it is solved. `within` and `contains` build a
//! boolean expression, they do not check anything on their own.

use crate::ids::{ParamId, PortId};
use crate::kind::Kind;
use crate::range::Range;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Boolean negation.
    Not,
    /// Lower bound of a range.
    Lower,
    /// Upper bound of a range.
    Upper,
    /// Midpoint of a range.
    Center,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication (scalar × range allowed).
    Mul,
    /// Division (range ÷ scalar allowed).
    Div,
    /// Boolean AND, short-circuiting on a known `false`.
    And,
    /// Boolean OR, short-circuiting on a known `true`.
    Or,
    /// Boolean XOR.
    Xor,
    /// Boolean implication.
    Implies,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less (ranges: entirely below).
    Lt,
    /// Less or equal.
    Le,
    /// Strictly greater (ranges: entirely above).
    Gt,
    /// Greater or equal.
    Ge,
    /// Containment of a range or point in a range.
    Contains,
    /// Smallest range covering both.
    Hull,
    /// Overlap of both ranges.
    Intersect,
    /// Minimum (ranges: bound-wise).
    Min,
    /// Maximum (ranges: bound-wise).
    Max,
    /// Builds a range from two float bounds.
    Bounds,
}

/// An array reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    /// Sum of numeric elements.
    Sum,
    /// Any element true.
    Any,
    /// All elements true.
    All,
    /// Number of true elements.
    Count,
    /// Hull of all ranges; empty for no elements.
    Hull,
    /// Intersection of all ranges; unbounded for no elements.
    Intersection,
    /// Number of elements.
    Length,
    /// Concatenation of an array of arrays.
    Flatten,
    /// No two elements are equal.
    AllUnique,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
            UnaryOp::Lower => "lower",
            UnaryOp::Upper => "upper",
            UnaryOp::Center => "center",
        };
        f.write_str(s)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Implies => "implies",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Contains => "contains",
            BinaryOp::Hull => "hull",
            BinaryOp::Intersect => "intersect",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::Bounds => "bounds",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Any => "any",
            ReduceOp::All => "all",
            ReduceOp::Count => "count",
            ReduceOp::Hull => "hull",
            ReduceOp::Intersection => "intersection",
            ReduceOp::Length => "length",
            ReduceOp::Flatten => "flatten",
            ReduceOp::AllUnique => "all_unique",
        };
        f.write_str(s)
    }
}

/// A malformed expression, detected while it is being built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// The operand kinds cannot be combined.
    #[error("`{op}` cannot combine {lhs} and {rhs}")]
    KindMismatch {
        /// Operator name.
        op: String,
        /// Left operand kind.
        lhs: Kind,
        /// Right operand kind.
        rhs: Kind,
    },

    /// The operator is not defined for the operand kind.
    #[error("`{op}` is not defined for {kind}")]
    UnsupportedKind {
        /// Operator name.
        op: String,
        /// Operand kind.
        kind: Kind,
    },

    /// Elementwise operands have different lengths.
    #[error("elementwise `{op}` on arrays of length {lhs} and {rhs}")]
    LengthMismatch {
        /// Operator name.
        op: String,
        /// Left length.
        lhs: usize,
        /// Right length.
        rhs: usize,
    },

    /// Elementwise operands whose length is only known after solving.
    #[error("elementwise `{op}` needs arrays of statically known length")]
    UnknownLength {
        /// Operator name.
        op: String,
    },
}

/// The shape of an expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    /// A constant.
    Literal(Value),
    /// A parameter, symbolic until the solver assigns it.
    Param(ParamId),
    /// A field of whatever link `port` ends up connected to.
    ///
    /// Links only exist once the enclosing block finalizes its nets, so
    /// blocks refer to their ports' link values through this deferred form.
    /// The constraint-graph snapshot resolves it to a [`ExprNode::Param`].
    LinkParam {
        /// The port whose link is referenced.
        port: PortId,
        /// Link field name.
        field: String,
    },
    /// A unary operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A reduction over an array.
    Reduce {
        /// Operator.
        op: ReduceOp,
        /// Array operand.
        operand: Box<Expr>,
    },
    /// An array built from element expressions.
    Array(Vec<Expr>),
    /// Conditional selection.
    IfThenElse {
        /// Boolean condition.
        cond: Box<Expr>,
        /// Value when true.
        then: Box<Expr>,
        /// Value when false.
        otherwise: Box<Expr>,
    },
}

/// A kind-checked constraint expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Result kind.
    pub kind: Kind,
    /// Node.
    pub node: ExprNode,
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::literal_of(Kind::Bool, Value::Bool(b))
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::literal_of(Kind::Int, Value::Int(i))
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::literal_of(Kind::Float, Value::Float(x))
    }
}

impl From<Range> for Expr {
    fn from(r: Range) -> Self {
        Expr::literal_of(Kind::Range, Value::Range(r))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::literal_of(Kind::Str, Value::Str(s.to_string()))
    }
}

impl Expr {
    fn literal_of(kind: Kind, value: Value) -> Self {
        Self {
            kind,
            node: ExprNode::Literal(value),
        }
    }

    /// A literal of an explicit kind.
    pub fn literal(kind: Kind, value: Value) -> Result<Self, ExprError> {
        if !value.conforms_to(&kind) {
            return Err(ExprError::KindMismatch {
                op: "literal".to_string(),
                lhs: kind,
                rhs: value.kind().unwrap_or(Kind::array_of(Kind::Bool)),
            });
        }
        Ok(Self::literal_of(kind, value))
    }

    /// A reference to a parameter of the given kind.
    pub fn param(id: ParamId, kind: Kind) -> Self {
        Self {
            kind,
            node: ExprNode::Param(id),
        }
    }

    /// A deferred reference to a field of `port`'s link.
    pub fn link_param(port: PortId, field: impl Into<String>, kind: Kind) -> Self {
        Self {
            kind,
            node: ExprNode::LinkParam {
                port,
                field: field.into(),
            },
        }
    }

    /// An array of `element`-kinded expressions.
    pub fn array(element: Kind, items: Vec<Expr>) -> Result<Self, ExprError> {
        if let Some(bad) = items.iter().find(|item| item.kind != element) {
            return Err(ExprError::KindMismatch {
                op: "array".to_string(),
                lhs: element,
                rhs: bad.kind.clone(),
            });
        }
        Ok(Self {
            kind: Kind::array_of(element),
            node: ExprNode::Array(items),
        })
    }

    /// The constant value, if this is a literal.
    pub fn as_literal(&self) -> Option<&Value> {
        match &self.node {
            ExprNode::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// The parameter, if this is a bare parameter reference.
    pub fn as_param(&self) -> Option<ParamId> {
        match self.node {
            ExprNode::Param(id) => Some(id),
            _ => None,
        }
    }

    /// Array length when it is known without solving.
    pub fn static_len(&self) -> Option<usize> {
        match &self.node {
            ExprNode::Array(items) => Some(items.len()),
            ExprNode::Literal(Value::Array(items)) => Some(items.len()),
            _ => None,
        }
    }

    /// Every parameter referenced by this expression, in first-seen order.
    pub fn params(&self) -> Vec<ParamId> {
        let mut out = Vec::new();
        self.visit(&mut |e| {
            if let ExprNode::Param(id) = e.node {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        });
        out
    }

    /// Returns `true` if any deferred link reference remains.
    pub fn has_link_params(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e.node, ExprNode::LinkParam { .. }));
        found
    }

    /// Pre-order traversal.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.node {
            ExprNode::Literal(_) | ExprNode::Param(_) | ExprNode::LinkParam { .. } => {}
            ExprNode::Unary { operand, .. } | ExprNode::Reduce { operand, .. } => operand.visit(f),
            ExprNode::Binary { lhs, rhs, .. } => {
                lhs.visit(f);
                rhs.visit(f);
            }
            ExprNode::Array(items) => items.iter().for_each(|item| item.visit(f)),
            ExprNode::IfThenElse {
                cond,
                then,
                otherwise,
            } => {
                cond.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
        }
    }

    /// Rebuilds the tree bottom-up, letting `f` replace any node.
    ///
    /// `f` sees each node after its children were rewritten and returns
    /// `None` to keep it.
    pub fn rewrite(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        let node = match &self.node {
            ExprNode::Literal(_) | ExprNode::Param(_) | ExprNode::LinkParam { .. } => {
                self.node.clone()
            }
            ExprNode::Unary { op, operand } => ExprNode::Unary {
                op: *op,
                operand: Box::new(operand.rewrite(f)),
            },
            ExprNode::Reduce { op, operand } => ExprNode::Reduce {
                op: *op,
                operand: Box::new(operand.rewrite(f)),
            },
            ExprNode::Binary { op, lhs, rhs } => ExprNode::Binary {
                op: *op,
                lhs: Box::new(lhs.rewrite(f)),
                rhs: Box::new(rhs.rewrite(f)),
            },
            ExprNode::Array(items) => {
                ExprNode::Array(items.iter().map(|item| item.rewrite(f)).collect())
            }
            ExprNode::IfThenElse {
                cond,
                then,
                otherwise,
            } => ExprNode::IfThenElse {
                cond: Box::new(cond.rewrite(f)),
                then: Box::new(then.rewrite(f)),
                otherwise: Box::new(otherwise.rewrite(f)),
            },
        };
        let rebuilt = Expr {
            kind: self.kind.clone(),
            node,
        };
        f(&rebuilt).unwrap_or(rebuilt)
    }

    fn unary(&self, op: UnaryOp) -> Result<Expr, ExprError> {
        let kind = match (op, &self.kind) {
            (UnaryOp::Neg, k) if k.is_numeric() => k.clone(),
            (UnaryOp::Not, Kind::Bool) => Kind::Bool,
            (UnaryOp::Lower | UnaryOp::Upper | UnaryOp::Center, Kind::Range) => Kind::Float,
            (_, k) => {
                return Err(ExprError::UnsupportedKind {
                    op: op.to_string(),
                    kind: k.clone(),
                })
            }
        };
        Ok(Expr {
            kind,
            node: ExprNode::Unary {
                op,
                operand: Box::new(self.clone()),
            },
        })
    }

    fn binary(&self, op: BinaryOp, rhs: &Expr) -> Result<Expr, ExprError> {
        let kind = binary_kind(op, &self.kind, &rhs.kind)?;
        if self.kind.is_array() && rhs.kind.is_array() {
            match (self.static_len(), rhs.static_len()) {
                (Some(l), Some(r)) if l != r => {
                    return Err(ExprError::LengthMismatch {
                        op: op.to_string(),
                        lhs: l,
                        rhs: r,
                    })
                }
                (Some(_), Some(_)) => {}
                _ => return Err(ExprError::UnknownLength { op: op.to_string() }),
            }
        }
        Ok(Expr {
            kind,
            node: ExprNode::Binary {
                op,
                lhs: Box::new(self.clone()),
                rhs: Box::new(rhs.clone()),
            },
        })
    }

    fn reduce(&self, op: ReduceOp) -> Result<Expr, ExprError> {
        let unsupported = || ExprError::UnsupportedKind {
            op: op.to_string(),
            kind: self.kind.clone(),
        };
        let element = self.kind.element().ok_or_else(unsupported)?;
        let kind = match (op, element) {
            (ReduceOp::Sum, k) if k.is_numeric() => k.clone(),
            (ReduceOp::Any | ReduceOp::All, Kind::Bool) => Kind::Bool,
            (ReduceOp::Count, Kind::Bool) => Kind::Int,
            (ReduceOp::Hull | ReduceOp::Intersection, Kind::Range) => Kind::Range,
            (ReduceOp::Length, _) => Kind::Int,
            (ReduceOp::Flatten, Kind::Array(inner)) => Kind::Array(inner.clone()),
            (ReduceOp::AllUnique, _) => Kind::Bool,
            _ => return Err(unsupported()),
        };
        Ok(Expr {
            kind,
            node: ExprNode::Reduce {
                op,
                operand: Box::new(self.clone()),
            },
        })
    }

    /// `self + rhs`.
    pub fn add(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Add, rhs)
    }

    /// `self - rhs`.
    pub fn sub(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// `self * rhs`.
    pub fn mul(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Mul, rhs)
    }

    /// `self / rhs`.
    pub fn div(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Div, rhs)
    }

    /// `-self`.
    pub fn neg(&self) -> Result<Expr, ExprError> {
        self.unary(UnaryOp::Neg)
    }

    /// `!self`.
    pub fn not(&self) -> Result<Expr, ExprError> {
        self.unary(UnaryOp::Not)
    }

    /// `self && rhs`.
    pub fn and(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::And, rhs)
    }

    /// `self || rhs`.
    pub fn or(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Or, rhs)
    }

    /// `self ^ rhs`.
    pub fn xor(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Xor, rhs)
    }

    /// `self => rhs`.
    pub fn implies(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Implies, rhs)
    }

    /// `self == rhs`.
    pub fn equal(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Eq, rhs)
    }

    /// `self != rhs`.
    pub fn not_equal(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Ne, rhs)
    }

    /// `self < rhs`.
    pub fn lt(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Lt, rhs)
    }

    /// `self <= rhs`.
    pub fn le(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Le, rhs)
    }

    /// `self > rhs`.
    pub fn gt(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Gt, rhs)
    }

    /// `self >= rhs`.
    pub fn ge(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Ge, rhs)
    }

    /// `self` (a range) contains `rhs` (a range or float).
    pub fn contains(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Contains, rhs)
    }

    /// `self` lies within `outer`.
    pub fn within(&self, outer: &Expr) -> Result<Expr, ExprError> {
        outer.contains(self)
    }

    /// Hull of two ranges.
    pub fn hull(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Hull, rhs)
    }

    /// Intersection of two ranges.
    pub fn intersect(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Intersect, rhs)
    }

    /// Minimum.
    pub fn min(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Min, rhs)
    }

    /// Maximum.
    pub fn max(&self, rhs: &Expr) -> Result<Expr, ExprError> {
        self.binary(BinaryOp::Max, rhs)
    }

    /// The range `[lower, upper]` from two float expressions.
    pub fn bounds(lower: &Expr, upper: &Expr) -> Result<Expr, ExprError> {
        lower.binary(BinaryOp::Bounds, upper)
    }

    /// Lower bound of a range.
    pub fn lower(&self) -> Result<Expr, ExprError> {
        self.unary(UnaryOp::Lower)
    }

    /// Upper bound of a range.
    pub fn upper(&self) -> Result<Expr, ExprError> {
        self.unary(UnaryOp::Upper)
    }

    /// Midpoint of a range.
    pub fn center(&self) -> Result<Expr, ExprError> {
        self.unary(UnaryOp::Center)
    }

    /// Sum of an array.
    pub fn sum(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Sum)
    }

    /// Any element of a boolean array is true.
    pub fn any(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Any)
    }

    /// All elements of a boolean array are true.
    pub fn all(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::All)
    }

    /// Number of true elements.
    pub fn count(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Count)
    }

    /// Hull over an array of ranges.
    pub fn hull_all(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Hull)
    }

    /// Intersection over an array of ranges.
    pub fn intersection(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Intersection)
    }

    /// Array length.
    pub fn length(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Length)
    }

    /// Concatenates an array of arrays.
    pub fn flatten(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::Flatten)
    }

    /// No two elements are equal.
    pub fn all_unique(&self) -> Result<Expr, ExprError> {
        self.reduce(ReduceOp::AllUnique)
    }

    /// `if cond { then } else { otherwise }`.
    pub fn if_then_else(cond: &Expr, then: &Expr, otherwise: &Expr) -> Result<Expr, ExprError> {
        if cond.kind != Kind::Bool {
            return Err(ExprError::UnsupportedKind {
                op: "if".to_string(),
                kind: cond.kind.clone(),
            });
        }
        if then.kind != otherwise.kind {
            return Err(ExprError::KindMismatch {
                op: "if".to_string(),
                lhs: then.kind.clone(),
                rhs: otherwise.kind.clone(),
            });
        }
        Ok(Expr {
            kind: then.kind.clone(),
            node: ExprNode::IfThenElse {
                cond: Box::new(cond.clone()),
                then: Box::new(then.clone()),
                otherwise: Box::new(otherwise.clone()),
            },
        })
    }
}

/// Result kind of `lhs op rhs`, or the reason the combination is rejected.
fn binary_kind(op: BinaryOp, lhs: &Kind, rhs: &Kind) -> Result<Kind, ExprError> {
    use BinaryOp::*;

    let mismatch = || ExprError::KindMismatch {
        op: op.to_string(),
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    };
    match op {
        Add | Sub | Mul | Div => match (lhs, rhs) {
            (Kind::Array(l), Kind::Array(r)) => {
                Ok(Kind::array_of(binary_kind(op, l, r).map_err(|_| mismatch())?))
            }
            (l, r) if l == r && l.is_numeric() => Ok(l.clone()),
            (Kind::Range, Kind::Float) if matches!(op, Mul | Div) => Ok(Kind::Range),
            (Kind::Float, Kind::Range) if op == Mul => Ok(Kind::Range),
            _ => Err(mismatch()),
        },
        And | Or | Xor | Implies => match (lhs, rhs) {
            (Kind::Bool, Kind::Bool) => Ok(Kind::Bool),
            _ => Err(mismatch()),
        },
        Eq | Ne if lhs == rhs => Ok(Kind::Bool),
        Lt | Le | Gt | Ge if lhs == rhs && lhs.is_numeric() => Ok(Kind::Bool),
        Contains => match (lhs, rhs) {
            (Kind::Range, Kind::Range | Kind::Float) => Ok(Kind::Bool),
            _ => Err(mismatch()),
        },
        Hull | Intersect => match (lhs, rhs) {
            (Kind::Range, Kind::Range) => Ok(Kind::Range),
            _ => Err(mismatch()),
        },
        Min | Max if lhs == rhs && lhs.is_numeric() => Ok(lhs.clone()),
        Bounds => match (lhs, rhs) {
            (Kind::Float, Kind::Float) => Ok(Kind::Range),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}
