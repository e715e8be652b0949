//! Hierarchical instance paths such as `top.mcu.i2c`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A dot-separated path from the design root to a block, port, link or parameter.
///
/// The root itself is the empty path and displays as `<top>`.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct HierPath {
    segments: Vec<String>,
}

impl HierPath {
    /// The empty root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. Empty segments are dropped.
    pub fn parse(text: &str) -> Self {
        Self {
            segments: text
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Returns a new path with `name` appended.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self { segments }
    }

    /// Returns the path without its last segment, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// The final segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// All segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &HierPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for HierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<top>");
        }
        write!(f, "{}", self.segments.join("."))
    }
}
