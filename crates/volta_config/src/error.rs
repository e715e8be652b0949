//! Errors raised while loading `volta.toml`.

/// A configuration file could not be loaded or is inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML is malformed or has the wrong shape.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value is present but unusable.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("design.top".to_string());
        assert_eq!(err.to_string(), "missing required field: design.top");
    }

    #[test]
    fn display_validation() {
        let err = ConfigError::ValidationError("max_rounds must be positive".to_string());
        assert_eq!(err.to_string(), "validation error: max_rounds must be positive");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
