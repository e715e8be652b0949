//! Structured diagnostics for design checking.
//!
//! A [`Diagnostic`] carries a severity, a stable [`DiagnosticCode`], the
//! hierarchical path of the block or link it concerns, and free-form notes.
//! The thread-safe [`DiagnosticSink`] accumulates them during elaboration and
//! a [`DiagnosticRenderer`] formats them for the terminal.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
