//! Diagnostic codes and helper functions for elaboration errors and warnings.
//!
//! Codes `E100`--`E113` cover definition-time errors (malformed blocks),
//! `E200`--`E204` resolution failures of the generator loop, `E300`--`E302`
//! and `W300` constraint checking, and `E400`--`E403` library lookups.

use volta_common::HierPath;
use volta_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Expression kind mismatch.
pub const E100: DiagnosticCode = DiagnosticCode::new(Category::Error, 100);

/// Incompatible port types with no registered adapter.
pub const E101: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);

/// Port connected a second time.
pub const E102: DiagnosticCode = DiagnosticCode::new(Category::Error, 102);

/// Generator request after the request set was fixed.
pub const E103: DiagnosticCode = DiagnosticCode::new(Category::Error, 103);

/// Unknown port field, sub-port or child port.
pub const E104: DiagnosticCode = DiagnosticCode::new(Category::Error, 104);

/// Connection outside the block's scope or of an unsupported shape.
pub const E105: DiagnosticCode = DiagnosticCode::new(Category::Error, 105);

/// Several link types could join a mixed net.
pub const E106: DiagnosticCode = DiagnosticCode::new(Category::Error, 106);

/// A link has no free role for a port.
pub const E107: DiagnosticCode = DiagnosticCode::new(Category::Error, 107);

/// Circular instantiation.
pub const E108: DiagnosticCode = DiagnosticCode::new(Category::Error, 108);

/// Name declared twice in one block.
pub const E109: DiagnosticCode = DiagnosticCode::new(Category::Error, 109);

/// Adapter prototype sets a field the adapter does not take.
pub const E110: DiagnosticCode = DiagnosticCode::new(Category::Error, 110);

/// A block declared a generator twice.
pub const E111: DiagnosticCode = DiagnosticCode::new(Category::Error, 111);

/// Capability port declared with a different type.
pub const E112: DiagnosticCode = DiagnosticCode::new(Category::Error, 112);

/// A parameter assigned two different values.
pub const E113: DiagnosticCode = DiagnosticCode::new(Category::Error, 113);

/// `get` on a value that is still symbolic.
pub const E200: DiagnosticCode = DiagnosticCode::new(Category::Error, 200);

/// A solver round resolved none of the pending generators.
pub const E201: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);

/// Generator rounds exceeded the configured limit.
pub const E202: DiagnosticCode = DiagnosticCode::new(Category::Error, 202);

/// Generator driven through an invalid state transition.
pub const E203: DiagnosticCode = DiagnosticCode::new(Category::Error, 203);

/// The solver failed.
pub const E204: DiagnosticCode = DiagnosticCode::new(Category::Error, 204);

/// A requirement evaluated to `false`.
pub const E300: DiagnosticCode = DiagnosticCode::new(Category::Error, 300);

/// The solver found two disagreeing values for one parameter.
pub const E301: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);

/// A required port was left unconnected.
pub const E302: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);

/// A requirement could not be decided.
pub const W300: DiagnosticCode = DiagnosticCode::new(Category::Warning, 300);

/// Unknown library element.
pub const E400: DiagnosticCode = DiagnosticCode::new(Category::Error, 400);

/// Two adapters registered for one port-type pair.
pub const E401: DiagnosticCode = DiagnosticCode::new(Category::Error, 401);

/// Abstract block with no default and no refinement.
pub const E402: DiagnosticCode = DiagnosticCode::new(Category::Error, 402);

/// Library element registered twice.
pub const E403: DiagnosticCode = DiagnosticCode::new(Category::Error, 403);

/// Creates a diagnostic for a requirement that evaluated to `false`.
pub fn error_violated(path: HierPath, message: &str) -> Diagnostic {
    Diagnostic::error(E300, message.to_string()).with_path(path)
}

/// Creates a diagnostic for a conflicting parameter value.
pub fn error_conflict(path: HierPath, kept: &str, rejected: &str, reason: &str) -> Diagnostic {
    Diagnostic::error(E301, format!("conflicting values for `{path}`"))
        .with_path(path)
        .with_note(format!("kept {kept}, rejected {rejected}"))
        .with_note(reason.to_string())
        .with_help("an exported port and its interior port must not both declare the field")
}

/// Creates a diagnostic for a required port nothing connects to.
pub fn error_unconnected(path: HierPath) -> Diagnostic {
    Diagnostic::error(E302, "required port is not connected")
        .with_path(path)
        .with_help("connect it, or declare it with `optional_port`")
}

/// Creates a warning for a requirement that stayed symbolic.
pub fn warn_unchecked(path: HierPath, message: &str) -> Diagnostic {
    Diagnostic::warning(W300, format!("could not check requirement: {message}"))
        .with_path(path)
        .with_note("one or more values it depends on were never resolved")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E100}"), "E100");
        assert_eq!(format!("{E300}"), "E300");
        assert_eq!(format!("{W300}"), "W300");
        assert_eq!(format!("{E403}"), "E403");
    }

    #[test]
    fn groups_match_numbering() {
        assert_eq!(E102.group(), 1);
        assert_eq!(E201.group(), 2);
        assert_eq!(E301.group(), 3);
        assert_eq!(E400.group(), 4);
    }

    #[test]
    fn violated_carries_path() {
        let d = error_violated(HierPath::parse("vdd"), "overvoltage");
        assert_eq!(d.code, E300);
        assert_eq!(d.message, "overvoltage");
        assert_eq!(d.path, Some(HierPath::parse("vdd")));
    }

    #[test]
    fn unchecked_is_warning() {
        let d = warn_unchecked(HierPath::parse("gpio"), "overcurrent");
        assert!(!d.severity.is_error());
        assert!(d.message.contains("overcurrent"));
    }
}
