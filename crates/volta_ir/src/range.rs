//! Closed intervals with interval arithmetic.
//!
//! A [`Range`] models a tolerance band such as a supply voltage of
//! `3.3V ± 5%`. Bounds may be infinite. Disjoint intersections produce the
//! canonical [`Range::EMPTY`], which is never contained by and never contains
//! a non-empty range in a way that would let a requirement pass by accident.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A closed interval `[lower, upper]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    lower: f64,
    upper: f64,
}

/// `a * b` with `0 * inf = 0`, which keeps zero-width ranges zero under unbounded scaling.
fn mul_bound(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        0.0
    } else {
        a * b
    }
}

impl Range {
    /// The unbounded interval.
    pub const ALL: Range = Range {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };
    /// `[0, 0]`.
    pub const ZERO: Range = Range {
        lower: 0.0,
        upper: 0.0,
    };
    /// `[0, +inf]`.
    pub const POSITIVE: Range = Range {
        lower: 0.0,
        upper: f64::INFINITY,
    };
    /// The empty interval. Identity of `hull`, absorbing for `intersect` and arithmetic.
    pub const EMPTY: Range = Range {
        lower: f64::INFINITY,
        upper: f64::NEG_INFINITY,
    };

    /// Creates `[lower, upper]`. Callers must pass ordered bounds.
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower <= upper, "range bounds out of order: [{lower}, {upper}]");
        Self { lower, upper }
    }

    /// Creates `[lower, upper]` if the bounds are ordered and not NaN.
    pub fn try_new(lower: f64, upper: f64) -> Option<Self> {
        (lower <= upper).then_some(Self { lower, upper })
    }

    /// The single point `[value, value]`.
    pub fn exact(value: f64) -> Self {
        Self::new(value, value)
    }

    /// `center` with a relative tolerance, e.g. `from_tolerance(3.3, 0.05)`.
    pub fn from_tolerance(center: f64, tolerance: f64) -> Self {
        let a = center * (1.0 - tolerance);
        let b = center * (1.0 + tolerance);
        Self::new(a.min(b), a.max(b))
    }

    /// `center ± tolerance` in absolute units.
    pub fn from_abs_tolerance(center: f64, tolerance: f64) -> Self {
        let tolerance = tolerance.abs();
        Self::new(center - tolerance, center + tolerance)
    }

    /// `[lower, +inf]`.
    pub fn from_lower(lower: f64) -> Self {
        Self::new(lower, f64::INFINITY)
    }

    /// `[-inf, upper]`.
    pub fn from_upper(upper: f64) -> Self {
        Self::new(f64::NEG_INFINITY, upper)
    }

    /// Lower bound. `+inf` for the empty range.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound. `-inf` for the empty range.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Midpoint, or NaN for the empty range.
    pub fn center(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        (self.lower + self.upper) / 2.0
    }

    /// Returns `true` for an interval with no points.
    pub fn is_empty(&self) -> bool {
        !(self.lower <= self.upper)
    }

    /// Set containment. An empty range contains nothing; every non-empty
    /// range contains the empty range.
    pub fn contains(&self, other: &Range) -> bool {
        if self.is_empty() {
            return false;
        }
        other.is_empty() || (self.lower <= other.lower && other.upper <= self.upper)
    }

    /// Point membership.
    pub fn contains_value(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Smallest range containing both.
    pub fn hull(&self, other: &Range) -> Range {
        Range {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Overlap of both, or [`Range::EMPTY`] if they are disjoint.
    pub fn intersect(&self, other: &Range) -> Range {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        Range::try_new(lower, upper).unwrap_or(Range::EMPTY)
    }

    /// Multiplies both bounds by a scalar, swapping them when it is negative.
    pub fn scale(&self, factor: f64) -> Range {
        if self.is_empty() {
            return Range::EMPTY;
        }
        let a = mul_bound(self.lower, factor);
        let b = mul_bound(self.upper, factor);
        Range::new(a.min(b), a.max(b))
    }

    /// `1 / self`. Unbounded on the side where the range touches zero, and
    /// [`Range::ALL`] when zero lies strictly inside or the range is exactly zero.
    pub fn reciprocal(&self) -> Range {
        if self.is_empty() {
            return Range::EMPTY;
        }
        let (lo, hi) = (self.lower, self.upper);
        if lo > 0.0 || hi < 0.0 {
            Range::new(1.0 / hi, 1.0 / lo)
        } else if lo == 0.0 && hi > 0.0 {
            Range::new(1.0 / hi, f64::INFINITY)
        } else if hi == 0.0 && lo < 0.0 {
            Range::new(f64::NEG_INFINITY, 1.0 / lo)
        } else {
            Range::ALL
        }
    }

    /// Elementwise minimum of the bounds.
    pub fn min(&self, other: &Range) -> Range {
        if self.is_empty() || other.is_empty() {
            return Range::EMPTY;
        }
        Range::new(self.lower.min(other.lower), self.upper.min(other.upper))
    }

    /// Elementwise maximum of the bounds.
    pub fn max(&self, other: &Range) -> Range {
        if self.is_empty() || other.is_empty() {
            return Range::EMPTY;
        }
        Range::new(self.lower.max(other.lower), self.upper.max(other.upper))
    }

    /// Exact bitwise equality, used for determinism checks.
    pub fn bit_eq(&self, other: &Range) -> bool {
        self.lower.to_bits() == other.lower.to_bits() && self.upper.to_bits() == other.upper.to_bits()
    }
}

impl Add for Range {
    type Output = Range;

    fn add(self, rhs: Range) -> Range {
        if self.is_empty() || rhs.is_empty() {
            return Range::EMPTY;
        }
        Range::new(self.lower + rhs.lower, self.upper + rhs.upper)
    }
}

impl Sub for Range {
    type Output = Range;

    fn sub(self, rhs: Range) -> Range {
        self + -rhs
    }
}

impl Neg for Range {
    type Output = Range;

    fn neg(self) -> Range {
        if self.is_empty() {
            return Range::EMPTY;
        }
        Range::new(-self.upper, -self.lower)
    }
}

impl Mul for Range {
    type Output = Range;

    fn mul(self, rhs: Range) -> Range {
        if self.is_empty() || rhs.is_empty() {
            return Range::EMPTY;
        }
        let corners = [
            mul_bound(self.lower, rhs.lower),
            mul_bound(self.lower, rhs.upper),
            mul_bound(self.upper, rhs.lower),
            mul_bound(self.upper, rhs.upper),
        ];
        let lower = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Range::new(lower, upper)
    }
}

impl Div for Range {
    type Output = Range;

    fn div(self, rhs: Range) -> Range {
        self * rhs.reciprocal()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Range> {
        vec![
            Range::ALL,
            Range::ZERO,
            Range::POSITIVE,
            Range::EMPTY,
            Range::new(0.0, 3.6),
            Range::new(3.0, 3.6),
            Range::new(3.3, 3.3),
            Range::new(4.5, 5.5),
            Range::new(-1.0, 1.0),
            Range::from_upper(2.0),
        ]
    }

    #[test]
    fn containment_is_transitive() {
        let all = samples();
        for a in &all {
            for b in &all {
                for c in &all {
                    if a.contains(b) && b.contains(c) {
                        assert!(a.contains(c), "{a} ⊇ {b} ⊇ {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn hull_and_intersect_are_idempotent() {
        for a in samples() {
            assert_eq!(a.hull(&a), a);
            assert_eq!(a.intersect(&a), a);
        }
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let limits = Range::new(0.0, 3.6);
        let supply = Range::new(4.5, 5.5);
        let overlap = limits.intersect(&supply);
        assert!(overlap.is_empty());
        assert!(!overlap.contains(&Range::exact(1.0)));
        assert!(!overlap.contains(&Range::EMPTY));
    }

    #[test]
    fn empty_is_hull_identity() {
        let r = Range::new(1.0, 2.0);
        assert_eq!(Range::EMPTY.hull(&r), r);
        assert_eq!(r.hull(&Range::EMPTY), r);
    }

    #[test]
    fn overvoltage_not_contained() {
        assert!(!Range::new(0.0, 3.6).contains(&Range::new(4.5, 5.5)));
        assert!(Range::new(0.0, 3.6).contains(&Range::new(3.0, 3.6)));
    }

    #[test]
    fn tolerance_constructors() {
        let r = Range::from_tolerance(10.0, 0.1);
        assert!((r.lower() - 9.0).abs() < 1e-12);
        assert!((r.upper() - 11.0).abs() < 1e-12);
        let neg = Range::from_tolerance(-10.0, 0.1);
        assert!(neg.lower() < neg.upper());
        assert_eq!(Range::from_abs_tolerance(5.0, -0.5), Range::new(4.5, 5.5));
    }

    #[test]
    fn interval_arithmetic() {
        let a = Range::new(1.0, 2.0);
        let b = Range::new(3.0, 5.0);
        assert_eq!(a + b, Range::new(4.0, 7.0));
        assert_eq!(b - a, Range::new(1.0, 4.0));
        assert_eq!(a * Range::new(-1.0, 2.0), Range::new(-2.0, 4.0));
        assert_eq!(Range::new(2.0, 4.0) / Range::new(1.0, 2.0), Range::new(1.0, 4.0));
        assert_eq!(a.scale(-2.0), Range::new(-4.0, -2.0));
    }

    #[test]
    fn zero_times_unbounded_is_zero() {
        assert_eq!(Range::ZERO * Range::ALL, Range::ZERO);
        assert_eq!(Range::ALL.scale(0.0), Range::ZERO);
    }

    #[test]
    fn division_touching_zero() {
        assert_eq!(Range::new(0.0, 2.0).reciprocal(), Range::new(0.5, f64::INFINITY));
        assert_eq!(Range::new(-1.0, 1.0).reciprocal(), Range::ALL);
        assert_eq!(Range::ZERO.reciprocal(), Range::ALL);
    }

    #[test]
    fn arithmetic_on_empty_is_empty() {
        assert!((Range::EMPTY + Range::ZERO).is_empty());
        assert!((Range::EMPTY * Range::ALL).is_empty());
        assert!((-Range::EMPTY).is_empty());
    }

    #[test]
    fn min_max_bounds() {
        let a = Range::new(1.0, 5.0);
        let b = Range::new(2.0, 3.0);
        assert_eq!(a.min(&b), Range::new(1.0, 3.0));
        assert_eq!(a.max(&b), Range::new(2.0, 5.0));
    }

    #[test]
    fn display() {
        assert_eq!(Range::new(0.0, 3.6).to_string(), "[0, 3.6]");
        assert_eq!(Range::EMPTY.to_string(), "(empty)");
    }
}
