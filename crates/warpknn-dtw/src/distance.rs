//! DTW distance value.

use std::cmp::Ordering;
use std::fmt;

/// A non-negative DTW distance: the square root of the accumulated squared cost.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DtwDistance(f64);

impl DtwDistance {
    /// Zero distance, the distance of any series to itself.
    pub const ZERO: Self = Self(0.0);

    /// Sentinel returned by early abandoning when the cutoff was exceeded.
    pub const INFINITY: Self = Self(f64::INFINITY);

    pub(crate) fn from_squared_cost(cost: f64) -> Self {
        Self(cost.sqrt())
    }

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return true for the early-abandon sentinel.
    #[must_use]
    pub fn is_abandoned(self) -> bool {
        self.0.is_infinite()
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for DtwDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_cost_is_rooted() {
        assert_eq!(DtwDistance::from_squared_cost(9.0).value(), 3.0);
        assert_eq!(DtwDistance::from_squared_cost(0.0), DtwDistance::ZERO);
    }

    #[test]
    fn sentinel_is_abandoned() {
        assert!(DtwDistance::INFINITY.is_abandoned());
        assert!(!DtwDistance::new(1e300).is_abandoned());
    }

    #[test]
    fn orders_totally() {
        let a = DtwDistance::new(1.0);
        let b = DtwDistance::new(2.0);
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(DtwDistance::INFINITY.total_cmp(&b), Ordering::Greater);
    }

    #[test]
    fn displays_six_decimals() {
        assert_eq!(DtwDistance::new(1.5).to_string(), "1.500000");
    }
}
