//! Parsing and validation of `volta.toml` design configuration files.
//!
//! The configuration names the top block, chooses how constraint violations
//! are reported, bounds the generator round trips, and carries the refinement
//! table that swaps abstract blocks for concrete ones.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
