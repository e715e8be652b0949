//! Loading and validating `volta.toml`.

use crate::error::ConfigError;
use crate::types::DesignConfig;
use std::path::Path;

/// File name looked up in a design directory.
pub const CONFIG_FILE_NAME: &str = "volta.toml";

/// Loads `<design_dir>/volta.toml`.
pub fn load_config(design_dir: &Path) -> Result<DesignConfig, ConfigError> {
    let content = std::fs::read_to_string(design_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<DesignConfig, ConfigError> {
    let config: DesignConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &DesignConfig) -> Result<(), ConfigError> {
    if config.design.name.trim().is_empty() {
        return Err(ConfigError::MissingField("design.name".to_string()));
    }
    if config.design.top.trim().is_empty() {
        return Err(ConfigError::MissingField("design.top".to_string()));
    }
    if config.elaboration.max_rounds == 0 {
        return Err(ConfigError::ValidationError(
            "elaboration.max_rounds must be at least 1".to_string(),
        ));
    }
    let refinements = &config.refinements;
    for (from, to) in refinements.paths.iter().chain(refinements.classes.iter()) {
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "refinement `{from}` -> `{to}` has an empty side"
            )));
        }
    }
    Ok(())
}
