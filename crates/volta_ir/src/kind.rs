//! Static kinds of constraint expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a constraint expression, checked when the expression is built.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Kind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating-point scalar.
    Float,
    /// Closed interval of floats.
    Range,
    /// String.
    Str,
    /// Homogeneous array.
    Array(Box<Kind>),
}

impl Kind {
    /// `Array(element)`.
    pub fn array_of(element: Kind) -> Kind {
        Kind::Array(Box::new(element))
    }

    /// Element kind of an array kind.
    pub fn element(&self) -> Option<&Kind> {
        match self {
            Kind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Returns `true` for kinds supporting arithmetic.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Kind::Int | Kind::Float | Kind::Range)
    }

    /// Returns `true` for array kinds.
    pub fn is_array(&self) -> bool {
        matches!(self, Kind::Array(_))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Bool => write!(f, "bool"),
            Kind::Int => write!(f, "int"),
            Kind::Float => write!(f, "float"),
            Kind::Range => write!(f, "range"),
            Kind::Str => write!(f, "string"),
            Kind::Array(element) => write!(f, "array<{element}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested() {
        assert_eq!(Kind::array_of(Kind::array_of(Kind::Int)).to_string(), "array<array<int>>");
    }

    #[test]
    fn element_and_numeric() {
        let k = Kind::array_of(Kind::Range);
        assert_eq!(k.element(), Some(&Kind::Range));
        assert!(!k.is_numeric());
        assert!(Kind::Range.is_numeric());
        assert!(!Kind::Bool.is_numeric());
    }
}
