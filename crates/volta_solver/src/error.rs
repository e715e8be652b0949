//! Solver failures.

use volta_common::HierPath;
use volta_ir::{EvalError, Kind};

/// A solver could not produce a resolution at all.
///
/// Unsatisfiable requirements are not solver errors; they are reported when
/// the requirements are checked against the returned values.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// An assignment could not be evaluated.
    #[error("cannot evaluate assignment to `{path}`: {source}")]
    Eval {
        /// Assigned parameter.
        path: HierPath,
        /// Cause.
        #[source]
        source: EvalError,
    },

    /// An assignment produced a value of the wrong kind.
    #[error("assignment to `{path}` produced {found}, expected {expected}")]
    KindMismatch {
        /// Assigned parameter.
        path: HierPath,
        /// Declared kind.
        expected: Kind,
        /// The produced value.
        found: String,
    },

    /// Propagation did not converge.
    #[error("solver did not converge after {limit} iterations")]
    IterationLimit {
        /// Iterations run.
        limit: usize,
    },

    /// A remote or wrapped solver failed.
    #[error("solver backend failed: {0}")]
    Backend(String),
}
