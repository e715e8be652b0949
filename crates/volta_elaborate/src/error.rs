//! Fatal elaboration errors.

use crate::errors::*;
use volta_common::{HierPath, InternalError};
use volta_diagnostics::{Diagnostic, DiagnosticCode};
use volta_ir::{EvalError, ExprError, GeneratorPhase, Kind, LinkType, PortType};
use volta_solver::SolverError;

/// An error that aborts elaboration of the whole design.
///
/// Definition-time and resolution errors point at a malformed block
/// definition, so there is no partial recovery from them. Constraint
/// violations are not errors of this type; they are diagnostics, and
/// [`ElabError::Violations`] only reports how many were found.
#[derive(Debug, thiserror::Error)]
pub enum ElabError {
    /// A malformed expression.
    #[error("invalid expression: {0}")]
    Expr(#[from] ExprError),

    /// A read value failed to evaluate.
    #[error("cannot evaluate value read by `{path}`")]
    Eval {
        /// Reading block.
        path: HierPath,
        /// Evaluation failure.
        #[source]
        source: EvalError,
    },

    /// A value of the wrong kind was assigned or required.
    #[error("`{path}` expects {expected}, found {found}")]
    KindMismatch {
        /// Target of the assignment or requirement.
        path: HierPath,
        /// Declared kind.
        expected: Kind,
        /// Offered kind.
        found: Kind,
    },

    /// Ports of different types with no adapter between them.
    #[error("cannot connect {a} `{a_path}` to {b} `{b_path}`: no adapter is registered")]
    IncompatiblePorts {
        /// First port type.
        a: PortType,
        /// First port.
        a_path: HierPath,
        /// Second port type.
        b: PortType,
        /// Second port.
        b_path: HierPath,
    },

    /// No adapter for an explicit `adapt_to`.
    #[error("no adapter from {src} to {dst} for `{path}`")]
    NoAdapter {
        /// Source port type.
        src: PortType,
        /// Requested destination type.
        dst: PortType,
        /// Adapted port.
        path: HierPath,
    },

    /// A non-vector port connected a second time.
    #[error("port `{path}` is already connected")]
    AlreadyConnected {
        /// The port.
        path: HierPath,
    },

    /// A generator declared or read a parameter after its request set was fixed.
    #[error("late request in `{path}`: {reason}")]
    LateRequest {
        /// Generator block.
        path: HierPath,
        /// What was requested.
        reason: String,
    },

    /// A port type has no field, or a block no port, of that name.
    #[error("`{path}` has no {what} `{name}`")]
    UnknownName {
        /// Element searched.
        path: HierPath,
        /// `field`, `port` or `sub-port`.
        what: &'static str,
        /// Missing name.
        name: String,
    },

    /// A connection the block cannot make.
    #[error("invalid connection in `{path}`: {reason}")]
    InvalidConnection {
        /// Block making the connection.
        path: HierPath,
        /// Why it was rejected.
        reason: String,
    },

    /// A mixed net could be adapted into more than one link type.
    #[error("ambiguous link for net in `{path}`: could be {}", join_names(.candidates))]
    AmbiguousLink {
        /// Block making the connection.
        path: HierPath,
        /// Candidate link types.
        candidates: Vec<LinkType>,
    },

    /// A link has no free role for a port.
    #[error("{link} has no free role for {ptype} port `{path}`")]
    NoRole {
        /// Link type.
        link: LinkType,
        /// Port type.
        ptype: PortType,
        /// The port.
        path: HierPath,
    },

    /// A block instantiates itself.
    #[error("circular instantiation of `{class}` at `{path}`")]
    CircularInstantiation {
        /// The class.
        class: String,
        /// Where it recurred.
        path: HierPath,
    },

    /// A name declared twice in one block.
    #[error("`{name}` is declared twice in `{path}`")]
    DuplicateName {
        /// The block.
        path: HierPath,
        /// Repeated name.
        name: String,
    },

    /// An adapter prototype sets a field the adapter does not take.
    #[error("adapter {src} -> {dst} takes no argument `{arg}`")]
    UnknownAdapterArg {
        /// Source type.
        src: PortType,
        /// Destination type.
        dst: PortType,
        /// Rejected field.
        arg: String,
    },

    /// A block declared a generator twice.
    #[error("`{path}` already declared a generator")]
    DuplicateGenerator {
        /// The block.
        path: HierPath,
    },

    /// A capability port exists with another type.
    #[error("capability `{capability}` needs `{path}` to be {expected}, found {found}")]
    CapabilityPort {
        /// Capability name.
        capability: &'static str,
        /// The port.
        path: HierPath,
        /// Required type.
        expected: PortType,
        /// Declared type.
        found: PortType,
    },

    /// A parameter already holds a different explicit assignment.
    #[error("`{path}` is already assigned a different value")]
    DuplicateAssign {
        /// The parameter.
        path: HierPath,
    },

    /// A generator read a value that is still symbolic.
    #[error("`{path}` read {what} while it is still symbolic")]
    SymbolicGet {
        /// Reading block.
        path: HierPath,
        /// What was read.
        what: String,
    },

    /// A solver round resolved none of the pending generators.
    #[error("no pending generator could be resolved: {}", join_paths(.paths))]
    Unresolvable {
        /// Pending generators.
        paths: Vec<HierPath>,
    },

    /// Too many generator rounds.
    #[error("generators did not settle within {limit} solver rounds")]
    RoundLimit {
        /// Configured limit.
        limit: usize,
    },

    /// A generator was driven through an invalid transition.
    #[error("generator `{path}` is {found:?}, expected {expected}")]
    GeneratorState {
        /// The generator block.
        path: HierPath,
        /// Current phase, `None` if the block is not a generator.
        found: Option<GeneratorPhase>,
        /// What the operation needed.
        expected: &'static str,
    },

    /// The solver failed outright.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Unknown library element.
    #[error("unknown library element `{name}`")]
    UnknownElement {
        /// Qualified name.
        name: String,
    },

    /// Two adapters for one port-type pair.
    #[error("an adapter from {src} to {dst} is already registered")]
    AmbiguousAdapter {
        /// Source type.
        src: PortType,
        /// Destination type.
        dst: PortType,
    },

    /// An abstract block with nothing to stand in for it.
    #[error("abstract block `{class}` at `{path}` has no default or refinement")]
    AbstractBlock {
        /// The abstract class.
        class: String,
        /// The instance.
        path: HierPath,
    },

    /// A library element registered twice.
    #[error("library element `{name}` is already registered")]
    DuplicateElement {
        /// Qualified name.
        name: String,
    },

    /// Checking found violated requirements or conflicts.
    #[error("design has {count} constraint violation(s)")]
    Violations {
        /// Number of error diagnostics emitted.
        count: usize,
    },

    /// A broken invariant inside volta.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

fn join_paths(paths: &[HierPath]) -> String {
    paths.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn join_names(links: &[LinkType]) -> String {
    links.iter().map(|l| l.name()).collect::<Vec<_>>().join(" or ")
}

impl ElabError {
    /// The stable diagnostic code.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ElabError::Expr(_) | ElabError::Eval { .. } | ElabError::KindMismatch { .. } => E100,
            ElabError::IncompatiblePorts { .. } | ElabError::NoAdapter { .. } => E101,
            ElabError::AlreadyConnected { .. } => E102,
            ElabError::LateRequest { .. } => E103,
            ElabError::UnknownName { .. } => E104,
            ElabError::InvalidConnection { .. } => E105,
            ElabError::AmbiguousLink { .. } => E106,
            ElabError::NoRole { .. } => E107,
            ElabError::CircularInstantiation { .. } => E108,
            ElabError::DuplicateName { .. } => E109,
            ElabError::UnknownAdapterArg { .. } => E110,
            ElabError::DuplicateGenerator { .. } => E111,
            ElabError::CapabilityPort { .. } => E112,
            ElabError::DuplicateAssign { .. } => E113,
            ElabError::SymbolicGet { .. } => E200,
            ElabError::Unresolvable { .. } => E201,
            ElabError::RoundLimit { .. } => E202,
            ElabError::GeneratorState { .. } => E203,
            ElabError::Solver(_) | ElabError::Internal(_) => E204,
            ElabError::Violations { .. } => E300,
            ElabError::UnknownElement { .. } => E400,
            ElabError::AmbiguousAdapter { .. } => E401,
            ElabError::AbstractBlock { .. } => E402,
            ElabError::DuplicateElement { .. } => E403,
        }
    }

    /// The hierarchical path the error concerns, if any.
    pub fn path(&self) -> Option<&HierPath> {
        match self {
            ElabError::KindMismatch { path, .. }
            | ElabError::Eval { path, .. }
            | ElabError::NoAdapter { path, .. }
            | ElabError::AlreadyConnected { path }
            | ElabError::LateRequest { path, .. }
            | ElabError::UnknownName { path, .. }
            | ElabError::InvalidConnection { path, .. }
            | ElabError::AmbiguousLink { path, .. }
            | ElabError::NoRole { path, .. }
            | ElabError::CircularInstantiation { path, .. }
            | ElabError::DuplicateName { path, .. }
            | ElabError::DuplicateGenerator { path }
            | ElabError::CapabilityPort { path, .. }
            | ElabError::DuplicateAssign { path }
            | ElabError::SymbolicGet { path, .. }
            | ElabError::GeneratorState { path, .. }
            | ElabError::AbstractBlock { path, .. } => Some(path),
            ElabError::IncompatiblePorts { a_path, .. } => Some(a_path),
            _ => None,
        }
    }

    /// Renders the error as a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.code(), self.to_string());
        if let Some(path) = self.path() {
            diag = diag.with_path(path.clone());
        }
        match self {
            ElabError::IncompatiblePorts { .. } => {
                diag.with_help("insert an adapter with `adapt_to`, or register one for this pair")
            }
            ElabError::CircularInstantiation { .. } => {
                diag.with_note("the block directly or indirectly instantiates itself")
            }
            ElabError::AbstractBlock { class, .. } => diag.with_help(format!(
                "add a `[refinements]` entry for `{class}` in volta.toml"
            )),
            ElabError::SymbolicGet { .. } | ElabError::LateRequest { .. } => {
                diag.with_note("this is a bug in the block definition, not in the design")
            }
            _ => diag,
        }
    }
}
