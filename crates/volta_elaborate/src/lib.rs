//! Block elaboration for volta designs.
//!
//! Runs block definitions into a [`Design`]: static `contents` bottom-up,
//! net finalization into links, exports, bridges and adapters, then the
//! batched generator loop against a [`Solver`], and finally requirement
//! checking into a [`DiagnosticSink`].
//!
//! # Usage
//!
//! ```ignore
//! let out = elaborate(top, &library, &adapters, &refinements, &options, &mut solver, &sink)?;
//! ```

#![warn(missing_docs)]

pub mod adapters;
pub mod block;
pub mod bridge;
pub mod builder;
pub mod capability;
pub mod check;
pub mod connect;
pub mod context;
pub mod error;
pub mod errors;
pub mod generator;
pub mod links;
pub mod netlist;
pub mod registry;

pub use adapters::{AdapterDef, AdapterPorts, AdapterRegistry};
pub use block::{BlockDef, BlockRef};
pub use builder::{BlockBuilder, BuildPhase};
pub use capability::{Capability, PowerRail, Resettable};
pub use check::CheckReport;
pub use context::ElaborationContext;
pub use error::ElabError;
pub use generator::SubstructureDiff;
pub use netlist::Netlist;
pub use registry::LibraryRegistry;

use volta_common::HierPath;
use volta_config::{ElaborationConfig, RefinementConfig, ViolationMode};
use volta_diagnostics::DiagnosticSink;
use volta_ir::{BlockId, Design, ParamId};
use volta_solver::{Resolution, Solver};

/// Elaboration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElabOptions {
    /// Whether checking stops at the first error.
    pub mode: ViolationMode,
    /// Upper bound on generator solver rounds.
    pub max_rounds: usize,
}

impl ElabOptions {
    /// Options from the `[elaboration]` table.
    pub fn from_config(config: &ElaborationConfig) -> Self {
        Self {
            mode: config.mode,
            max_rounds: config.max_rounds,
        }
    }
}

impl Default for ElabOptions {
    fn default() -> Self {
        Self::from_config(&ElaborationConfig::default())
    }
}

/// Step-by-step elaboration of one design.
pub struct Elaborator<'a> {
    ctx: ElaborationContext<'a>,
    options: ElabOptions,
    rounds: usize,
}

impl<'a> Elaborator<'a> {
    /// Creates an elaborator with an empty design.
    pub fn new(
        library: &'a LibraryRegistry,
        adapters: &'a AdapterRegistry,
        refinements: &'a RefinementConfig,
        options: ElabOptions,
    ) -> Self {
        Self {
            ctx: ElaborationContext::new(library, adapters, refinements),
            options,
            rounds: 0,
        }
    }

    /// Instantiates the top block and its static hierarchy.
    pub fn instantiate_top(&mut self, top: BlockRef) -> Result<BlockId, ElabError> {
        let name = top.class().rsplit('.').next().unwrap_or_default().to_string();
        self.ctx.instantiate(None, &name, top)
    }

    /// Runs pending generators to a fixpoint; returns the rounds this call took.
    pub fn run_generators(&mut self, solver: &mut dyn Solver) -> Result<usize, ElabError> {
        let rounds = generator::run_generators(&mut self.ctx, solver, self.options.max_rounds)?;
        self.rounds += rounds;
        Ok(rounds)
    }

    /// Runs one generator by path with externally resolved values.
    pub fn elaborate_generator(
        &mut self,
        path: &HierPath,
        resolution: &Resolution,
    ) -> Result<SubstructureDiff, ElabError> {
        let block = self
            .ctx
            .design
            .find_block(path)
            .ok_or_else(|| ElabError::GeneratorState {
                path: path.clone(),
                found: None,
                expected: "an existing generator block",
            })?;
        generator::elaborate_generator(&mut self.ctx, block, resolution)
    }

    /// Solves every parameter of the current design.
    pub fn solve(&self, solver: &mut dyn Solver) -> Result<Resolution, ElabError> {
        let graph = self.ctx.design.constraint_graph();
        let all: Vec<ParamId> = graph.params.iter().map(|p| p.id).collect();
        Ok(solver.resolve(&graph, &all)?)
    }

    /// Checks requirements against `resolution`.
    pub fn check(&self, resolution: &Resolution, sink: &DiagnosticSink) -> CheckReport {
        check::check(&self.ctx.design, resolution, self.options.mode, sink)
    }

    /// Solver rounds spent on generators so far.
    pub fn generator_rounds(&self) -> usize {
        self.rounds
    }

    /// The design so far.
    pub fn design(&self) -> &Design {
        &self.ctx.design
    }

    /// Consumes the elaborator, returning the design.
    pub fn into_design(self) -> Design {
        self.ctx.design
    }
}

/// A fully elaborated and checked design.
#[derive(Debug, Clone)]
pub struct Elaborated {
    /// The design.
    pub design: Design,
    /// Values from the final solve.
    pub resolution: Resolution,
    /// Solver rounds spent on generators.
    pub generator_rounds: usize,
    /// Check outcome.
    pub report: CheckReport,
}

/// Elaborates `top`, runs its generators, solves and checks the result.
///
/// Violated requirements are emitted to `sink`; if any were found the
/// result is [`ElabError::Violations`].
pub fn elaborate(
    top: BlockRef,
    library: &LibraryRegistry,
    adapters: &AdapterRegistry,
    refinements: &RefinementConfig,
    options: &ElabOptions,
    solver: &mut dyn Solver,
    sink: &DiagnosticSink,
) -> Result<Elaborated, ElabError> {
    let class = top.class().to_string();
    let mut elab = Elaborator::new(library, adapters, refinements, *options);
    elab.instantiate_top(top)?;
    let generator_rounds = elab.run_generators(solver)?;
    let resolution = elab.solve(solver)?;
    let report = elab.check(&resolution, sink);
    let design = elab.into_design();
    tracing::info!(
        top = %class,
        blocks = design.blocks.len(),
        links = design.links.len(),
        rounds = generator_rounds,
        errors = report.errors(),
        "elaborated"
    );
    if !report.is_clean() {
        return Err(ElabError::Violations {
            count: report.errors(),
        });
    }
    Ok(Elaborated {
        design,
        resolution,
        generator_rounds,
        report,
    })
}
