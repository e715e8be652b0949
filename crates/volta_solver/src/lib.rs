//! The solver boundary.
//!
//! Elaboration hands a [`ConstraintGraph`] snapshot and the set of parameters
//! it is waiting on to a [`Solver`], which answers with a [`Resolution`]:
//! concrete values for whatever it could decide, plus any conflicts it found.
//! [`ConstPropSolver`] is the in-process reference implementation.

#![warn(missing_docs)]

pub mod const_prop;
pub mod error;
pub mod resolution;

pub use const_prop::ConstPropSolver;
pub use error::SolverError;
pub use resolution::{Conflict, Resolution};

use volta_ir::{ConstraintGraph, ParamId};

/// Assigns concrete values to symbolic parameters.
pub trait Solver {
    /// Solves `graph`. The returned values must cover every parameter of
    /// `requested` that can be decided; values for other parameters may be
    /// included.
    fn resolve(
        &mut self,
        graph: &ConstraintGraph,
        requested: &[ParamId],
    ) -> Result<Resolution, SolverError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn resolve(
        &mut self,
        graph: &ConstraintGraph,
        requested: &[ParamId],
    ) -> Result<Resolution, SolverError> {
        (**self).resolve(graph, requested)
    }
}
