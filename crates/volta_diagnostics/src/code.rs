//! Diagnostic codes: a category letter plus a three-digit number.
//!
//! Numbering is grouped by the kind of failure: `1xx` definition errors,
//! `2xx` resolution errors, `3xx` constraint checks, `4xx` library errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a code, which determines its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Errors, prefixed with `E`.
    Error,
    /// Warnings, prefixed with `W`.
    Warning,
}

impl Category {
    /// Returns the prefix letter.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
        }
    }
}

/// A stable code such as `E300`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category.
    pub category: Category,
    /// Number within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }

    /// Returns the hundreds group (1 definition, 2 resolution, 3 constraint, 4 library).
    pub fn group(self) -> u16 {
        self.number / 100
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
