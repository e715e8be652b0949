//! Rendering diagnostics for humans.

use crate::diagnostic::Diagnostic;

/// Formats a diagnostic into text.
pub trait DiagnosticRenderer {
    /// Renders one diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// rustc-style terminal output:
///
/// ```text
/// error[E300]: overvoltage
///   --> at vdd_net
///    = note: requirement failed: voltage_limits.contains(voltage)
/// ```
pub struct TerminalRenderer {
    /// Whether to emit ANSI colors.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();
        if self.color {
            out.push_str(&format!(
                "{}{}[{}]\x1b[0m: {}\n",
                diag.severity.ansi(),
                diag.severity,
                diag.code,
                diag.message
            ));
        } else {
            out.push_str(&format!("{}[{}]: {}\n", diag.severity, diag.code, diag.message));
        }
        if let Some(path) = &diag.path {
            out.push_str(&format!("  --> at {path}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}
