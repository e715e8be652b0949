//! Configuration types deserialized from `volta.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use volta_common::HierPath;

/// The whole `volta.toml` file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DesignConfig {
    /// Design metadata and top block.
    pub design: DesignMeta,
    /// Elaboration policy.
    #[serde(default)]
    pub elaboration: ElaborationConfig,
    /// Abstract-block refinements.
    #[serde(default)]
    pub refinements: RefinementConfig,
    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// The `[design]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DesignMeta {
    /// Design name, used in reports.
    pub name: String,
    /// Qualified library name of the top block, e.g. `demo.Blinky`.
    pub top: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// How constraint violations are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationMode {
    /// Stop checking at the first violated requirement.
    #[default]
    FailFast,
    /// Report every violated requirement in one pass.
    Collect,
}

/// The `[elaboration]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElaborationConfig {
    /// Violation reporting policy.
    #[serde(default)]
    pub mode: ViolationMode,
    /// Upper bound on batched solver round trips for generators.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

fn default_max_rounds() -> usize {
    32
}

impl Default for ElaborationConfig {
    fn default() -> Self {
        Self {
            mode: ViolationMode::default(),
            max_rounds: default_max_rounds(),
        }
    }
}

/// The `[refinements]` table: which concrete class replaces an abstract one.
///
/// Path entries win over class entries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefinementConfig {
    /// Instance path (e.g. `power.reg`) to qualified class name.
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    /// Qualified class name to qualified class name.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,
}

impl RefinementConfig {
    /// Returns the refinement for an instance, checking its path first and then its class.
    pub fn lookup(&self, path: &HierPath, class: &str) -> Option<&str> {
        self.paths
            .get(&path.to_string())
            .or_else(|| self.classes.get(class))
            .map(String::as_str)
    }
}

/// The `[output]` table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Where to write the netlist view as JSON.
    #[serde(default)]
    pub netlist: Option<String>,
    /// Where to write the binary interchange message.
    #[serde(default)]
    pub interchange: Option<String>,
}
