//! Generator elaboration and the batched solver loop.
//!
//! A generator block fixes its requests during `contents`. Each round the
//! driver snapshots the design, asks the solver for every outstanding request
//! at once, and runs `generate` for each generator whose requests came back
//! concrete. Generated structure may declare further generators, so rounds
//! repeat until none are pending.

use std::collections::BTreeSet;

use serde::Serialize;
use volta_common::{HierPath, InternalError};
use volta_ir::{eval, BlockId, Design, GeneratorPhase, LinkId, ParamId, PortId};
use volta_solver::{Resolution, Solver};

use crate::builder::{BlockBuilder, BuildPhase};
use crate::context::ElaborationContext;
use crate::error::ElabError;

/// Elements created by one `generate` run, in allocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubstructureDiff {
    /// New blocks.
    pub blocks: Vec<BlockId>,
    /// New ports.
    pub ports: Vec<PortId>,
    /// New links.
    pub links: Vec<LinkId>,
    /// New parameters.
    pub params: Vec<ParamId>,
}

impl SubstructureDiff {
    /// Returns `true` if nothing was created.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.ports.is_empty() && self.links.is_empty() && self.params.is_empty()
    }
}

fn set_phase(design: &mut Design, block: BlockId, phase: GeneratorPhase) {
    if let Some(g) = design.blocks[block].generator.as_mut() {
        g.phase = phase;
    }
}

/// Generators that have not run yet, in handle order.
pub fn pending(design: &Design) -> Vec<BlockId> {
    design
        .blocks
        .iter()
        .filter(|(_, b)| {
            matches!(
                b.generator.as_ref().map(|g| g.phase),
                Some(GeneratorPhase::Declared | GeneratorPhase::Waiting)
            )
        })
        .map(|(id, _)| id)
        .collect()
}

/// Parameters a generator's requests read, with link references resolved.
pub fn requested_params(design: &Design, block: BlockId) -> Vec<ParamId> {
    let Some(state) = design.blocks[block].generator.as_ref() else {
        return Vec::new();
    };
    let mut out = BTreeSet::new();
    for request in &state.requests {
        out.extend(design.resolve_expr(request).params());
    }
    out.into_iter().collect()
}

/// Returns `true` if every request of `block` evaluates to a concrete value.
fn is_ready(design: &Design, block: BlockId, resolution: &Resolution) -> bool {
    let Some(state) = design.blocks[block].generator.as_ref() else {
        return false;
    };
    state.requests.iter().all(|request| {
        let resolved = design.resolve_expr(request);
        !resolved.has_link_params() && matches!(eval(&resolved, resolution), Ok(Some(_)))
    })
}

/// Runs the deferred body of one generator with solved values.
///
/// The generator must not have run yet and every request must evaluate to a
/// concrete value under `resolution`.
pub fn elaborate_generator(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    resolution: &Resolution,
) -> Result<SubstructureDiff, ElabError> {
    let path = ctx.design.block_path(block);
    let state = ctx.design.blocks[block]
        .generator
        .as_ref()
        .ok_or_else(|| ElabError::GeneratorState {
            path: path.clone(),
            found: None,
            expected: "a generator block",
        })?;
    if state.phase == GeneratorPhase::Generated {
        return Err(ElabError::GeneratorState {
            path,
            found: Some(state.phase),
            expected: "a generator that has not run",
        });
    }
    let mut allowed = BTreeSet::new();
    for request in &state.requests {
        let resolved = ctx.design.resolve_expr(request);
        if resolved.has_link_params() {
            return Err(ElabError::SymbolicGet {
                path,
                what: "a field of a link that does not exist".to_string(),
            });
        }
        match eval(&resolved, resolution) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(ElabError::SymbolicGet {
                    path,
                    what: "a request the solver left unresolved".to_string(),
                })
            }
            Err(source) => return Err(ElabError::Eval { path, source }),
        }
        allowed.extend(resolved.params());
    }
    set_phase(&mut ctx.design, block, GeneratorPhase::Resolved);

    let def = ctx
        .generator_def(block)
        .ok_or_else(|| InternalError::new(format!("generator `{path}` has no definition")))?;
    let marks = (
        ctx.design.blocks.next_id(),
        ctx.design.ports.next_id(),
        ctx.design.links.next_id(),
        ctx.design.params.next_id(),
    );
    let phase = BuildPhase::Generate {
        allowed,
        values: resolution.values.clone(),
    };
    ctx.push_elab_stack(def.class(), &path)?;
    let result = run_generate(ctx, block, &*def, phase);
    ctx.pop_elab_stack();
    result?;
    set_phase(&mut ctx.design, block, GeneratorPhase::Generated);

    let design = &ctx.design;
    let diff = SubstructureDiff {
        blocks: design.blocks.ids_from(marks.0).collect(),
        ports: design.ports.ids_from(marks.1).collect(),
        links: design.links.ids_from(marks.2).collect(),
        params: design.params.ids_from(marks.3).collect(),
    };
    tracing::debug!(
        %path,
        class = def.class(),
        blocks = diff.blocks.len(),
        links = diff.links.len(),
        "generated"
    );
    Ok(diff)
}

fn run_generate(
    ctx: &mut ElaborationContext<'_>,
    block: BlockId,
    def: &dyn crate::block::BlockDef,
    phase: BuildPhase,
) -> Result<(), ElabError> {
    let mut b = BlockBuilder::new(ctx, block, phase);
    def.generate(&mut b)?;
    b.finish()
}

/// Runs generators to a fixpoint and returns the number of solver rounds.
///
/// Each round sends one snapshot with the union of all outstanding requests.
/// A round in which no pending generator became ready is an error, as is
/// exceeding `max_rounds`.
pub fn run_generators(
    ctx: &mut ElaborationContext<'_>,
    solver: &mut dyn Solver,
    max_rounds: usize,
) -> Result<usize, ElabError> {
    let mut rounds = 0;
    loop {
        let waiting = pending(&ctx.design);
        if waiting.is_empty() {
            return Ok(rounds);
        }
        if rounds >= max_rounds {
            return Err(ElabError::RoundLimit { limit: max_rounds });
        }
        rounds += 1;
        for &g in &waiting {
            set_phase(&mut ctx.design, g, GeneratorPhase::Waiting);
        }
        let requested: Vec<ParamId> = waiting
            .iter()
            .flat_map(|g| requested_params(&ctx.design, *g))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let graph = ctx.design.constraint_graph();
        let resolution = solver.resolve(&graph, &requested)?;
        let ready: Vec<BlockId> = waiting
            .iter()
            .copied()
            .filter(|g| is_ready(&ctx.design, *g, &resolution))
            .collect();
        tracing::info!(
            round = rounds,
            pending = waiting.len(),
            ready = ready.len(),
            requested = requested.len(),
            "generator round"
        );
        if ready.is_empty() {
            let paths: Vec<HierPath> = waiting.iter().map(|g| ctx.design.block_path(*g)).collect();
            return Err(ElabError::Unresolvable { paths });
        }
        for g in ready {
            elaborate_generator(ctx, g, &resolution)?;
        }
    }
}
