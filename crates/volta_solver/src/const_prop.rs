//! Deterministic constant propagation.
//!
//! Assignments are evaluated in target order against the values known so
//! far, and export equalities copy a known side onto an unknown one in either
//! direction. Every productive pass decides at least one new parameter, so
//! the loop ends after at most one pass per parameter. A final pass compares
//! every assignment and equality against the fixpoint and records conflicts.

use crate::error::SolverError;
use crate::resolution::{Conflict, Resolution};
use crate::Solver;
use std::collections::{BTreeMap, BTreeSet};
use volta_ir::{eval, ConstraintGraph, ParamId, Value};

/// Reference solver: evaluates assignments to a fixpoint.
#[derive(Debug, Clone, Default)]
pub struct ConstPropSolver {
    passes: usize,
}

impl ConstPropSolver {
    /// Creates a solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of propagation passes run by the last `resolve`.
    pub fn last_passes(&self) -> usize {
        self.passes
    }
}

fn same(a: &Value, b: &Value) -> bool {
    a == b || a.bit_eq(b)
}

impl Solver for ConstPropSolver {
    fn resolve(
        &mut self,
        graph: &ConstraintGraph,
        requested: &[ParamId],
    ) -> Result<Resolution, SolverError> {
        let mut values: BTreeMap<ParamId, Value> = BTreeMap::new();
        let limit = graph.params.len() + 1;
        self.passes = 0;
        loop {
            self.passes += 1;
            if self.passes > limit {
                return Err(SolverError::IterationLimit { limit });
            }
            let mut changed = false;
            for assign in &graph.assigns {
                if values.contains_key(&assign.target) {
                    continue;
                }
                let value = eval(&assign.expr, &values).map_err(|source| SolverError::Eval {
                    path: path_of(graph, assign.target),
                    source,
                })?;
                if let Some(value) = value {
                    if let Some(info) = graph.param(assign.target) {
                        if !value.conforms_to(&info.kind) {
                            return Err(SolverError::KindMismatch {
                                path: info.path.clone(),
                                expected: info.kind.clone(),
                                found: value.to_string(),
                            });
                        }
                    }
                    values.insert(assign.target, value);
                    changed = true;
                }
            }
            for (a, b) in &graph.equalities {
                let copy = match (values.get(a), values.get(b)) {
                    (Some(v), None) => Some((*b, v.clone())),
                    (None, Some(v)) => Some((*a, v.clone())),
                    _ => None,
                };
                if let Some((target, value)) = copy {
                    values.insert(target, value);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let conflicts = find_conflicts(graph, &values)?;
        let resolved = requested.iter().filter(|id| values.contains_key(id)).count();
        tracing::debug!(
            passes = self.passes,
            values = values.len(),
            requested = requested.len(),
            resolved,
            conflicts = conflicts.len(),
            "constant propagation converged"
        );
        Ok(Resolution { values, conflicts })
    }
}

fn path_of(graph: &ConstraintGraph, id: ParamId) -> volta_common::HierPath {
    graph
        .param(id)
        .map(|p| p.path.clone())
        .unwrap_or_else(|| volta_common::HierPath::parse(&id.to_string()))
}

fn find_conflicts(
    graph: &ConstraintGraph,
    values: &BTreeMap<ParamId, Value>,
) -> Result<Vec<Conflict>, SolverError> {
    let mut conflicts = Vec::new();
    let mut seen = BTreeSet::new();
    for assign in &graph.assigns {
        let Some(kept) = values.get(&assign.target) else {
            continue;
        };
        let proposed = eval(&assign.expr, values).map_err(|source| SolverError::Eval {
            path: path_of(graph, assign.target),
            source,
        })?;
        if let Some(proposed) = proposed {
            if !same(kept, &proposed) && seen.insert(assign.target) {
                conflicts.push(Conflict {
                    param: assign.target,
                    path: path_of(graph, assign.target),
                    kept: kept.clone(),
                    rejected: proposed,
                    reason: "assignment disagrees with an exported value".to_string(),
                });
            }
        }
    }
    for (a, b) in &graph.equalities {
        if let (Some(x), Some(y)) = (values.get(a), values.get(b)) {
            if !same(x, y) && seen.insert(*b) {
                conflicts.push(Conflict {
                    param: *b,
                    path: path_of(graph, *b),
                    kept: y.clone(),
                    rejected: x.clone(),
                    reason: format!("exported as `{}` with a different value", path_of(graph, *a)),
                });
            }
        }
    }
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use volta_common::HierPath;
    use volta_ir::{Assign, Expr, Kind, ParamInfo, Range};

    fn graph(kinds: &[Kind]) -> ConstraintGraph {
        ConstraintGraph {
            params: kinds
                .iter()
                .enumerate()
                .map(|(i, k)| ParamInfo {
                    id: ParamId::from_raw(i as u32),
                    kind: k.clone(),
                    path: HierPath::parse(&format!("p{i}")),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn id(n: u32) -> ParamId {
        ParamId::from_raw(n)
    }

    fn range(n: u32) -> Expr {
        Expr::param(id(n), Kind::Range)
    }

    #[test]
    fn propagates_through_chain_out_of_order() {
        let mut g = graph(&[Kind::Range, Kind::Range, Kind::Range]);
        // p0 := p1 + p2, p1 := p2, p2 := [1, 2]
        g.assigns = vec![
            Assign { target: id(0), expr: range(1).add(&range(2)).unwrap() },
            Assign { target: id(1), expr: range(2) },
            Assign { target: id(2), expr: Expr::from(Range::new(1.0, 2.0)) },
        ];
        let mut solver = ConstPropSolver::new();
        let r = solver.resolve(&g, &[id(0)]).unwrap();
        assert_eq!(r.get(id(0)), Some(&Value::Range(Range::new(2.0, 4.0))));
        assert!(r.conflicts.is_empty());
        assert!(solver.last_passes() <= 4);
    }

    #[test]
    fn equality_propagates_both_ways() {
        let mut g = graph(&[Kind::Range, Kind::Range, Kind::Range, Kind::Range]);
        g.assigns = vec![
            Assign { target: id(0), expr: Expr::from(Range::new(0.0, 5.0)) },
            Assign { target: id(3), expr: Expr::from(Range::ZERO) },
        ];
        g.equalities = vec![(id(0), id(1)), (id(2), id(3))];
        let r = ConstPropSolver::new().resolve(&g, &[]).unwrap();
        assert_eq!(r.get(id(1)), Some(&Value::Range(Range::new(0.0, 5.0))));
        assert_eq!(r.get(id(2)), Some(&Value::Range(Range::ZERO)));
    }

    #[test]
    fn conflicting_equality_reported() {
        let mut g = graph(&[Kind::Range, Kind::Range]);
        g.assigns = vec![
            Assign { target: id(0), expr: Expr::from(Range::new(0.0, 5.0)) },
            Assign { target: id(1), expr: Expr::from(Range::new(0.0, 3.6)) },
        ];
        g.equalities = vec![(id(0), id(1))];
        let r = ConstPropSolver::new().resolve(&g, &[]).unwrap();
        assert_eq!(r.conflicts.len(), 1);
        assert_eq!(r.conflicts[0].param, id(1));
        assert_eq!(r.conflicts[0].path.to_string(), "p1");
    }

    #[test]
    fn unassigned_stays_unresolved() {
        let mut g = graph(&[Kind::Range, Kind::Range]);
        g.assigns = vec![Assign { target: id(0), expr: range(1) }];
        let r = ConstPropSolver::new().resolve(&g, &[id(0)]).unwrap();
        assert!(!r.covers(&[id(0)]));
    }

    #[test]
    fn wrong_kind_rejected() {
        let mut g = graph(&[Kind::Range]);
        g.assigns = vec![Assign { target: id(0), expr: Expr::from(true) }];
        let err = ConstPropSolver::new().resolve(&g, &[]).unwrap_err();
        assert!(matches!(err, SolverError::KindMismatch { .. }));
    }

    #[test]
    fn eval_failure_names_parameter() {
        let mut g = graph(&[Kind::Int]);
        g.assigns = vec![Assign {
            target: id(0),
            expr: Expr::from(1i64).div(&Expr::from(0i64)).unwrap(),
        }];
        match ConstPropSolver::new().resolve(&g, &[]).unwrap_err() {
            SolverError::Eval { path, .. } => assert_eq!(path.to_string(), "p0"),
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let mut g = graph(&[Kind::Range, Kind::Range, Kind::Range]);
        g.assigns = vec![
            Assign { target: id(0), expr: Expr::from(Range::new(0.1, 0.3)) },
            Assign { target: id(1), expr: range(0).hull(&Expr::from(Range::new(-0.2, 0.0))).unwrap() },
            Assign { target: id(2), expr: range(1).mul(&range(0)).unwrap() },
        ];
        let a = ConstPropSolver::new().resolve(&g, &[]).unwrap();
        let b = ConstPropSolver::new().resolve(&g, &[]).unwrap();
        for (k, v) in &a.values {
            assert!(v.bit_eq(&b.values[k]));
        }
    }
}
