//! Shared foundational types used across the volta hardware-description compiler.
//!
//! This crate provides interned library names, content hashing for the
//! interchange format, hierarchical instance paths, and the internal-error
//! result type.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod path;
pub mod result;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use path::HierPath;
pub use result::{InternalError, VoltaResult};
