//! Shared helpers for CLI commands: locating and loading `volta.toml`,
//! resolving output paths, and rendering diagnostics.

use std::path::{Path, PathBuf};

use volta_config::{DesignConfig, CONFIG_FILE_NAME};
use volta_diagnostics::{Diagnostic, DiagnosticRenderer, Severity, TerminalRenderer};

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing `volta.toml`.
pub fn find_design_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the design configuration selected by the global flags.
///
/// `--config` may name a TOML file (loaded as is, rooted at its directory)
/// or a design directory. Without it the nearest `volta.toml` above the
/// current directory is used. Returns the design root and its config.
pub fn load_design(
    global: &GlobalArgs,
) -> Result<(PathBuf, DesignConfig), Box<dyn std::error::Error>> {
    let root = match &global.config {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_file() {
                let content = std::fs::read_to_string(&path)?;
                let config = volta_config::load_config_from_str(&content)?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                return Ok((root, config));
            }
            path
        }
        None => find_design_root(&std::env::current_dir()?)?,
    };
    let config = volta_config::load_config(&root)?;
    Ok((root, config))
}

/// Picks an output path: the command-line flag as given, else the config
/// entry relative to the design root.
pub fn output_path(flag: Option<&str>, configured: Option<&str>, root: &Path) -> Option<PathBuf> {
    flag.map(PathBuf::from)
        .or_else(|| configured.map(|p| root.join(p)))
}

/// Writes `contents` to `path`, creating parent directories.
pub fn write_output(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, contents)
}

/// Renders diagnostics to stderr.
pub fn render_diagnostics(diagnostics: &[Diagnostic], global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for diag in diagnostics {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(diag));
    }
}

/// Error and warning counts.
pub fn count_severities(diagnostics: &[Diagnostic]) -> (usize, usize) {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    (errors, warnings)
}
