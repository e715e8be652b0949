//! Volta CLI: the command-line front end for the volta design compiler.
//!
//! Provides `volta list` to browse the block library, `volta build` to
//! elaborate and check the design configured in `volta.toml`, and
//! `volta inspect` to summarize an interchange file.

#![warn(missing_docs)]

mod build;
mod inspect;
mod library;
mod list;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Volta: hardware designs as checked block hierarchies.
#[derive(Parser, Debug)]
#[command(name = "volta", version, about = "Volta hardware design compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `volta.toml` file or the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List library elements.
    List {
        /// Module to list, e.g. `power`. Lists everything if omitted.
        module: Option<String>,
    },
    /// Elaborate and check the configured design.
    Build(BuildArgs),
    /// Summarize an interchange file.
    Inspect {
        /// Path to the file.
        file: String,
    },
}

/// Arguments for the `volta build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Output format for the report and diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Route every solver round trip through the binary interchange format.
    #[arg(long)]
    pub wire: bool,

    /// Write the netlist as JSON to this path (overrides `output.netlist`).
    #[arg(long)]
    pub netlist: Option<String>,

    /// Write the design snapshot to this path (overrides `output.interchange`).
    #[arg(long)]
    pub emit: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// Log filter used when `RUST_LOG` is unset.
    fn default_filter(&self) -> &'static str {
        if self.quiet {
            "volta=error"
        } else if self.verbose {
            "volta=debug"
        } else {
            "volta=info"
        }
    }
}

fn init_logging(global: &GlobalArgs) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| global.default_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(global.color)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::List { ref module } => list::run(module.as_deref(), &global),
        Command::Build(ref args) => build::run(args, &global),
        Command::Inspect { ref file } => inspect::run(file, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn is_terminal() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}
