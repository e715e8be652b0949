//! Block definitions.

use crate::builder::BlockBuilder;
use crate::error::ElabError;
use std::sync::Arc;

/// Shared handle to a block definition.
pub type BlockRef = Arc<dyn BlockDef>;

/// A block class: declares ports, parameters, sub-blocks and connections.
///
/// `contents` runs once per instance while the design is built. Generator
/// blocks additionally call [`BlockBuilder::generator`] from `contents` and
/// get `generate` run once their requested values are concrete.
pub trait BlockDef: Send + Sync {
    /// Qualified class name, e.g. `power.Ldo`.
    fn class(&self) -> &str;

    /// Declares the block's static structure.
    fn contents(&self, b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError>;

    /// Declares the structure that depends on solved values.
    fn generate(&self, _b: &mut BlockBuilder<'_, '_>) -> Result<(), ElabError> {
        Ok(())
    }

    /// Abstract blocks are replaced by a default or a refinement before
    /// `contents` runs.
    fn is_abstract(&self) -> bool {
        false
    }

    /// Capabilities this class implements, for library listings.
    fn capabilities(&self) -> &[&'static str] {
        &[]
    }

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }
}
