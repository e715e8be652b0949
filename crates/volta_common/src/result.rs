//! Result type for internal invariants of the compiler itself.

/// Result of an operation that can only fail because of a bug in volta.
///
/// User design problems are never reported through this type: definition
/// errors use the elaborator's error enum and constraint violations go to
/// the diagnostic sink.
pub type VoltaResult<T> = Result<T, InternalError>;

/// A broken internal invariant.
#[derive(Debug, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// What went wrong.
    pub message: String,
}

impl InternalError {
    /// Creates an internal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefix() {
        let err = InternalError::new("dangling port handle");
        assert_eq!(err.to_string(), "internal compiler error: dangling port handle");
    }

    #[test]
    fn question_mark_converts_strings() {
        fn fails() -> VoltaResult<()> {
            Err(String::from("bad arena index"))?
        }
        assert_eq!(fails().unwrap_err().message, "bad arena index");
    }
}
