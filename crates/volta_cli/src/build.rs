//! `volta build`: elaborate, solve and check the configured design.
//!
//! 1. Load `volta.toml` (see [`crate::pipeline::load_design`])
//! 2. Look up the top block in the reference library
//! 3. Elaborate against the in-process solver, or through the wire
//!    encoding with `--wire`
//! 4. Render diagnostics and the summary
//! 5. Write the netlist and the design snapshot if asked to

use serde::Serialize;
use volta_config::DesignConfig;
use volta_diagnostics::{Diagnostic, DiagnosticSink};
use volta_elaborate::{
    elaborate, AdapterRegistry, CheckReport, ElabError, ElabOptions, Elaborated, LibraryRegistry,
    Netlist,
};
use volta_interchange::{write_file, Message, WireSolver};
use volta_solver::ConstPropSolver;

use crate::library::reference_library;
use crate::pipeline::{count_severities, load_design, output_path, render_diagnostics, write_output};
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Result of elaborating one configured design.
pub struct Outcome {
    /// The checked design, if elaboration finished without errors.
    pub elaborated: Option<Elaborated>,
    /// Everything emitted along the way, including fatal errors.
    pub diagnostics: Vec<Diagnostic>,
    /// Solver round trips, when routed through the wire encoding.
    pub round_trips: Option<usize>,
}

/// Elaborates the top block named by `config`.
///
/// Only an unknown top class is returned as an error; elaboration failures
/// become diagnostics in the outcome.
pub fn elaborate_config(
    config: &DesignConfig,
    library: &LibraryRegistry,
    wire: bool,
) -> Result<Outcome, ElabError> {
    let top = library.get_library_element(&config.design.top)?;
    let adapters = AdapterRegistry::standard();
    let options = ElabOptions::from_config(&config.elaboration);
    let sink = DiagnosticSink::new();

    let (result, round_trips) = if wire {
        let mut solver = WireSolver::new(ConstPropSolver::new());
        let result = elaborate(
            top,
            library,
            &adapters,
            &config.refinements,
            &options,
            &mut solver,
            &sink,
        );
        tracing::info!(
            round_trips = solver.round_trips(),
            sent = solver.bytes_sent(),
            received = solver.bytes_received(),
            "wire solver finished"
        );
        (result, Some(solver.round_trips()))
    } else {
        let mut solver = ConstPropSolver::new();
        let result = elaborate(
            top,
            library,
            &adapters,
            &config.refinements,
            &options,
            &mut solver,
            &sink,
        );
        (result, None)
    };

    let elaborated = match result {
        Ok(elab) => Some(elab),
        // Already reported through the sink.
        Err(ElabError::Violations { .. }) => None,
        Err(err) => {
            sink.emit(err.to_diagnostic());
            None
        }
    };
    Ok(Outcome {
        elaborated,
        diagnostics: sink.take_all(),
        round_trips,
    })
}

/// Machine-readable build report.
#[derive(Serialize)]
struct BuildReport<'a> {
    design: &'a str,
    top: &'a str,
    ok: bool,
    generator_rounds: Option<usize>,
    round_trips: Option<usize>,
    check: Option<CheckReport>,
    blocks: usize,
    links: usize,
    netlist: Option<&'a Netlist>,
    diagnostics: &'a [Diagnostic],
}

/// Runs the `volta build` command.
///
/// Returns exit code 0 if the design checked clean, 1 otherwise.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (root, config) = load_design(global)?;
    let library = reference_library()?;

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "  Elaborating {} ({})",
            config.design.name, config.design.top
        );
    }

    let outcome = elaborate_config(&config, &library, args.wire)?;
    let netlist = outcome
        .elaborated
        .as_ref()
        .map(|elab| Netlist::build(&elab.design));
    let (errors, warnings) = count_severities(&outcome.diagnostics);

    match args.format {
        ReportFormat::Text => {
            render_diagnostics(&outcome.diagnostics, global);
            if !global.quiet {
                if let (Some(elab), Some(netlist)) = (&outcome.elaborated, &netlist) {
                    eprintln!(
                        "     Checked {} requirement(s) over {} block(s) and {} link(s) in {} generator round(s)",
                        elab.report.satisfied + elab.report.unchecked,
                        elab.design.blocks.len(),
                        elab.design.links.len(),
                        elab.generator_rounds
                    );
                    eprintln!(
                        "     Netlist {} part(s), {} net(s)",
                        netlist.parts.len(),
                        netlist.nets.len()
                    );
                }
                eprintln!("   Result: {errors} error(s), {warnings} warning(s)");
            }
        }
        ReportFormat::Json => {
            let elab = outcome.elaborated.as_ref();
            let report = BuildReport {
                design: &config.design.name,
                top: &config.design.top,
                ok: errors == 0,
                generator_rounds: elab.map(|e| e.generator_rounds),
                round_trips: outcome.round_trips,
                check: elab.map(|e| e.report),
                blocks: elab.map_or(0, |e| e.design.blocks.len()),
                links: elab.map_or(0, |e| e.design.links.len()),
                netlist: netlist.as_ref(),
                diagnostics: &outcome.diagnostics,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    let Some(elab) = outcome.elaborated else {
        return Ok(1);
    };

    if let (Some(path), Some(netlist)) = (
        output_path(args.netlist.as_deref(), config.output.netlist.as_deref(), &root),
        &netlist,
    ) {
        write_output(&path, serde_json::to_string_pretty(netlist)?.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote netlist");
    }
    if let Some(path) = output_path(
        args.emit.as_deref(),
        config.output.interchange.as_deref(),
        &root,
    ) {
        let bytes = write_file(&path, &Message::design(elab.design))?;
        tracing::info!(path = %path.display(), bytes, "wrote design snapshot");
    }

    Ok(if errors > 0 { 1 } else { 0 })
}
