//! Solver answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use volta_common::HierPath;
use volta_ir::{Env, ParamId, Value};

/// Two sources disagree about a parameter's value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// The parameter.
    pub param: ParamId,
    /// Its path.
    pub path: HierPath,
    /// The value that was kept.
    pub kept: Value,
    /// The value that disagreed.
    pub rejected: Value,
    /// Where the disagreement came from.
    pub reason: String,
}

/// Values decided by a solver.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Concrete values by parameter.
    pub values: BTreeMap<ParamId, Value>,
    /// Disagreements found while solving.
    pub conflicts: Vec<Conflict>,
}

impl Resolution {
    /// The value of `id`, if decided.
    pub fn get(&self, id: ParamId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Returns `true` if every parameter in `ids` has a value.
    pub fn covers(&self, ids: &[ParamId]) -> bool {
        ids.iter().all(|id| self.values.contains_key(id))
    }
}

impl Env for Resolution {
    fn lookup(&self, id: ParamId) -> Option<&Value> {
        self.values.get(&id)
    }
}
