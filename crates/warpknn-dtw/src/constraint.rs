//! Warping window constraint.

use std::fmt;
use std::ops::Range;

use crate::error::DtwError;

/// Constraint on how far aligned indices may drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BandConstraint {
    /// No constraint: every cell of the cost grid is reachable.
    #[default]
    Unconstrained,

    /// Sakoe-Chiba band: cell `(i, j)` is valid only if `|i - j| <= radius`.
    SakoeChibaRadius(usize),
}

impl BandConstraint {
    /// Build a constraint from an optional radius, `None` meaning unconstrained.
    #[must_use]
    pub fn from_window(window: Option<usize>) -> Self {
        window.map_or(Self::Unconstrained, Self::SakoeChibaRadius)
    }

    /// Return the band radius, or `None` when unconstrained.
    #[must_use]
    pub fn window(&self) -> Option<usize> {
        match self {
            Self::Unconstrained => None,
            Self::SakoeChibaRadius(r) => Some(*r),
        }
    }

    /// Check that a warping path from `(0, 0)` to `(len_a - 1, len_b - 1)` exists.
    ///
    /// # Errors
    ///
    /// Returns [`DtwError::WindowTooNarrow`] when the radius is smaller than
    /// `|len_a - len_b|`.
    pub fn admits(&self, len_a: usize, len_b: usize) -> Result<(), DtwError> {
        match self {
            Self::SakoeChibaRadius(window) if *window < len_a.abs_diff(len_b) => {
                Err(DtwError::WindowTooNarrow {
                    window: *window,
                    len_a,
                    len_b,
                })
            }
            _ => Ok(()),
        }
    }

    /// Return the valid column range for zero-based `row` in an `n_rows x n_cols` grid.
    ///
    /// For Sakoe-Chiba this is `[row - r, row + r]` clipped to `[0, n_cols)`.
    #[must_use]
    pub fn column_range(&self, row: usize, n_cols: usize) -> Range<usize> {
        match self {
            Self::Unconstrained => 0..n_cols,
            Self::SakoeChibaRadius(r) => {
                let start = row.saturating_sub(*r);
                let end = row.saturating_add(*r).saturating_add(1).min(n_cols);
                start..end.max(start)
            }
        }
    }
}

impl fmt::Display for BandConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("unconstrained"),
            Self::SakoeChibaRadius(r) => write!(f, "sakoe-chiba(r={r})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_covers_every_column() {
        let c = BandConstraint::Unconstrained;
        assert_eq!(c.column_range(0, 7), 0..7);
        assert_eq!(c.column_range(6, 7), 0..7);
    }

    #[test]
    fn sakoe_chiba_clips_at_edges() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(0, 10), 0..3);
        assert_eq!(c.column_range(5, 10), 3..8);
        assert_eq!(c.column_range(9, 10), 7..10);
    }

    #[test]
    fn huge_radius_does_not_overflow() {
        let c = BandConstraint::SakoeChibaRadius(usize::MAX);
        assert_eq!(c.column_range(3, 5), 0..5);
    }

    #[test]
    fn window_round_trip() {
        assert_eq!(BandConstraint::from_window(None), BandConstraint::Unconstrained);
        assert_eq!(BandConstraint::from_window(Some(3)).window(), Some(3));
        assert_eq!(BandConstraint::default().window(), None);
    }

    #[test]
    fn admits_rejects_radius_below_length_gap() {
        let c = BandConstraint::SakoeChibaRadius(1);
        assert!(c.admits(4, 5).is_ok());
        assert_eq!(
            c.admits(3, 6),
            Err(DtwError::WindowTooNarrow { window: 1, len_a: 3, len_b: 6 })
        );
        assert!(BandConstraint::Unconstrained.admits(1, 100).is_ok());
    }

    #[test]
    fn display_names_the_band() {
        assert_eq!(BandConstraint::Unconstrained.to_string(), "unconstrained");
        assert_eq!(BandConstraint::SakoeChibaRadius(4).to_string(), "sakoe-chiba(r=4)");
    }
}
