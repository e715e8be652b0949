//! Intermediate representation of volta designs.
//!
//! This crate holds the constraint-expression algebra ([`Range`], [`Value`],
//! [`Kind`], [`Expr`] and [`eval`]), the port and link type library, the
//! arena-backed [`Design`] produced by elaboration, and the flat
//! [`ConstraintGraph`] snapshot that crosses the solver boundary.

#![warn(missing_docs)]

pub mod arena;
pub mod design;
pub mod eval;
pub mod expr;
pub mod graph;
pub mod ids;
pub mod kind;
pub mod model;
pub mod range;
pub mod types;
pub mod value;

pub use arena::{Arena, ArenaId};
pub use design::{
    Block, BlockKind, Design, Export, Footprint, GeneratorPhase, GeneratorState, Link, Owner,
    Param, Port, Require,
};
pub use eval::{eval, Env, EvalError};
pub use expr::{BinaryOp, Expr, ExprError, ExprNode, ReduceOp, UnaryOp};
pub use graph::{Assign, ConstraintGraph, GraphRequire, ParamInfo};
pub use ids::{BlockId, LinkId, ParamId, PortId};
pub use kind::Kind;
pub use model::PortModel;
pub use range::Range;
pub use types::{FieldDefault, FieldKind, FieldSpec, LinkType, Multiplicity, PortType, RoleSpec};
pub use value::Value;
