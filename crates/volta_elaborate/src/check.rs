//! Final requirement checking.
//!
//! After the last solve every requirement is evaluated against the solved
//! values. Conflicts reported by the solver and requirements that evaluate
//! to `false` are errors; requirements that stay symbolic are warnings.

use serde::Serialize;
use volta_config::ViolationMode;
use volta_diagnostics::DiagnosticSink;
use volta_ir::{eval, BlockKind, Design, Value};
use volta_solver::Resolution;

use crate::errors::{error_conflict, error_unconnected, error_violated, warn_unchecked};

/// Outcome counts of a check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Requirements that held.
    pub satisfied: usize,
    /// Requirements that evaluated to `false`.
    pub violated: usize,
    /// Requirements that could not be decided.
    pub unchecked: usize,
    /// Conflicting parameter values.
    pub conflicts: usize,
    /// Required ports left unconnected.
    pub unconnected: usize,
}

impl CheckReport {
    /// Number of error diagnostics emitted.
    pub fn errors(&self) -> usize {
        self.violated + self.conflicts + self.unconnected
    }

    /// Returns `true` if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.errors() == 0
    }
}

/// Checks `design` against `resolution`, emitting into `sink`.
///
/// In [`ViolationMode::FailFast`] checking stops after the first error.
pub fn check(
    design: &Design,
    resolution: &Resolution,
    mode: ViolationMode,
    sink: &DiagnosticSink,
) -> CheckReport {
    let mut report = CheckReport::default();
    let stop = |report: &CheckReport| mode == ViolationMode::FailFast && !report.is_clean();

    for conflict in &resolution.conflicts {
        sink.emit(error_conflict(
            conflict.path.clone(),
            &conflict.kept.to_string(),
            &conflict.rejected.to_string(),
            &conflict.reason,
        ));
        report.conflicts += 1;
        if stop(&report) {
            return report;
        }
    }

    for (block_id, block) in design.blocks.iter() {
        if block.parent.is_none() || block.kind != BlockKind::Hierarchy {
            continue;
        }
        for &port in &block.ports {
            if !design.ports[port].optional && !design.is_connected(port) {
                tracing::debug!(block = %design.block_path(block_id), "unconnected required port");
                sink.emit(error_unconnected(design.port_path(port)));
                report.unconnected += 1;
                if stop(&report) {
                    return report;
                }
            }
        }
    }

    let graph = design.constraint_graph();
    for require in &graph.requires {
        match eval(&require.expr, resolution) {
            Ok(Some(Value::Bool(true))) => report.satisfied += 1,
            Ok(Some(_)) => {
                sink.emit(error_violated(require.path.clone(), &require.message));
                report.violated += 1;
            }
            Ok(None) => {
                sink.emit(warn_unchecked(require.path.clone(), &require.message));
                report.unchecked += 1;
            }
            Err(err) => {
                sink.emit(
                    error_violated(require.path.clone(), &require.message)
                        .with_note(format!("evaluation failed: {err}")),
                );
                report.violated += 1;
            }
        }
        if stop(&report) {
            break;
        }
    }
    tracing::debug!(
        satisfied = report.satisfied,
        violated = report.violated,
        unchecked = report.unchecked,
        conflicts = report.conflicts,
        "checked requirements"
    );
    report
}
