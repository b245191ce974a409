//! DTW distance computation.
//!
//! All variants evaluate the same recurrence over a padded `(m+1) x (n+1)`
//! grid:
//!
//! ```text
//! D[0][0] = 0,  D[i][0] = D[0][j] = +inf
//! D[i][j] = (a[i-1] - b[j-1])^2 + min(D[i-1][j], D[i][j-1], D[i-1][j-1])
//! distance = sqrt(D[m][n])
//! ```
//!
//! restricted to `|i - j| <= r` under a Sakoe-Chiba band of radius `r`.

use std::mem;
use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::constraint::BandConstraint;
use crate::distance::DtwDistance;
use crate::error::DtwError;
use crate::matrix::DistanceMatrix;
use crate::path::{WarpingPath, WarpingStep};
use crate::series::{TimeSeries, TimeSeriesView};

/// Relative slack applied to squared cutoffs so float rounding in `cutoff^2`
/// never abandons a pair whose rooted distance is within the cutoff.
const CUTOFF_SLACK: f64 = 1e-12;

/// Immutable DTW configuration. Thread-safe and copyable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dtw {
    constraint: BandConstraint,
}

impl Dtw {
    /// Create an unconstrained DTW calculator.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::from_constraint(BandConstraint::Unconstrained)
    }

    /// Create a DTW calculator with a Sakoe-Chiba band of the given radius.
    #[must_use]
    pub fn with_sakoe_chiba(radius: usize) -> Self {
        Self::from_constraint(BandConstraint::SakoeChibaRadius(radius))
    }

    /// Create a DTW calculator from an existing [`BandConstraint`].
    #[must_use]
    pub fn from_constraint(constraint: BandConstraint) -> Self {
        Self { constraint }
    }

    /// Return the band constraint configuration.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Compute the DTW distance between two series.
    ///
    /// Uses two rolling rows of the padded grid: O(m * n) time unconstrained,
    /// O(m * r) with a band of radius `r`, and O(n) memory either way.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::WindowTooNarrow`] | band radius `< |m - n|` |
    /// | [`DtwError::NonFiniteDistance`] | the accumulated cost overflows |
    #[instrument(level = "trace", skip(a, b), fields(m = a.len(), n = b.len()))]
    pub fn distance(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
    ) -> Result<DtwDistance, DtwError> {
        self.constraint.admits(a.len(), b.len())?;
        self.accumulate(a.as_slice(), b.as_slice(), None)
            .ok_or(DtwError::NonFiniteDistance)
            .and_then(rooted)
    }

    /// Validate two raw slices and compute their DTW distance.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySeries`] | either slice is empty |
    /// | [`DtwError::NonFiniteValue`] | either slice holds NaN or infinity |
    /// | [`DtwError::WindowTooNarrow`] | band radius `< |m - n|` |
    /// | [`DtwError::NonFiniteDistance`] | the accumulated cost overflows |
    pub fn distance_slices(&self, a: &[f64], b: &[f64]) -> Result<DtwDistance, DtwError> {
        self.distance(TimeSeriesView::new(a)?, TimeSeriesView::new(b)?)
    }

    /// Compute the DTW distance, abandoning as soon as it must exceed `cutoff`.
    ///
    /// Exact: returns [`DtwDistance::INFINITY`] if and only if the distance is
    /// strictly greater than `cutoff`, otherwise the same value as
    /// [`distance`](Self::distance). A NaN cutoff disables abandoning.
    ///
    /// Pairs large enough that their cost might overflow are never abandoned,
    /// so this fails exactly when [`distance`](Self::distance) fails.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::WindowTooNarrow`] | band radius `< |m - n|` |
    /// | [`DtwError::NonFiniteDistance`] | the accumulated cost overflows |
    pub fn distance_with_cutoff(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        cutoff: f64,
    ) -> Result<DtwDistance, DtwError> {
        self.constraint.admits(a.len(), b.len())?;
        let (a, b) = (a.as_slice(), b.as_slice());
        let threshold = (!cutoff.is_nan() && cost_is_bounded(a, b))
            .then(|| cutoff.max(0.0).powi(2) * (1.0 + CUTOFF_SLACK));
        let Some(cost) = self.accumulate(a, b, threshold) else {
            return Ok(DtwDistance::INFINITY);
        };
        let dist = rooted(cost)?;
        if dist.value() > cutoff {
            return Ok(DtwDistance::INFINITY);
        }
        Ok(dist)
    }

    /// Materialize the full `(m+1) x (n+1)` cost grid.
    ///
    /// Cells outside the band stay `+inf`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::WindowTooNarrow`] | band radius `< |m - n|` |
    /// | [`DtwError::NonFiniteDistance`] | the accumulated cost overflows |
    #[instrument(skip(self, a, b), fields(m = a.len(), n = b.len(), constraint = %self.constraint))]
    pub fn cost_grid(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
    ) -> Result<CostGrid, DtwError> {
        self.constraint.admits(a.len(), b.len())?;
        let (a, b) = (a.as_slice(), b.as_slice());
        let cols = b.len() + 1;
        let mut grid = CostGrid {
            rows: a.len() + 1,
            cols,
            cells: vec![f64::INFINITY; (a.len() + 1) * cols],
        };
        grid.cells[0] = 0.0;

        for i in 1..grid.rows {
            for j in self.band_columns(i, b.len()) {
                let best = grid
                    .get(i - 1, j - 1)
                    .min(grid.get(i - 1, j))
                    .min(grid.get(i, j - 1));
                grid.cells[i * cols + j] = (a[i - 1] - b[j - 1]).powi(2) + best;
            }
        }
        if !grid.cells[grid.cells.len() - 1].is_finite() {
            return Err(DtwError::NonFiniteDistance);
        }
        Ok(grid)
    }

    /// Compute the DTW distance and an optimal warping path.
    ///
    /// Allocates the full grid; use [`distance`](Self::distance) when only the
    /// scalar is needed. On equal predecessors the traceback prefers the
    /// diagonal, then the step that advances only `a`, then only `b`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::WindowTooNarrow`] | band radius `< |m - n|` |
    /// | [`DtwError::NonFiniteDistance`] | the accumulated cost overflows |
    pub fn distance_and_path(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
    ) -> Result<(DtwDistance, WarpingPath), DtwError> {
        let grid = self.cost_grid(a, b)?;
        let (mut i, mut j) = (grid.rows - 1, grid.cols - 1);
        let mut steps = Vec::with_capacity(i + j);

        loop {
            steps.push(WarpingStep { a: i - 1, b: j - 1 });
            if i == 1 && j == 1 {
                break;
            }
            let diag = grid.get(i - 1, j - 1);
            let up = grid.get(i - 1, j);
            let left = grid.get(i, j - 1);
            if diag <= up && diag <= left {
                i -= 1;
                j -= 1;
            } else if up <= left {
                i -= 1;
            } else {
                j -= 1;
            }
        }
        steps.reverse();

        Ok((grid.distance(), WarpingPath::new(steps)))
    }

    /// Compute pairwise DTW distances for a collection of series.
    ///
    /// Returns a symmetric [`DistanceMatrix`]; pairs are computed in parallel.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::WindowTooNarrow`] | any pair's length gap exceeds the band |
    /// | [`DtwError::NonFiniteDistance`] | any pair's accumulated cost overflows |
    #[instrument(skip(self, series), fields(n = series.len()))]
    pub fn pairwise(&self, series: &[TimeSeries]) -> Result<DistanceMatrix, DtwError> {
        let n = series.len();
        let distances = (1..n)
            .into_par_iter()
            .flat_map_iter(|i| (0..i).map(move |j| (i, j)))
            .map(|(i, j)| self.distance(series[i].as_view(), series[j].as_view()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pairs = distances.len(), "pairwise distances computed");
        Ok(DistanceMatrix::from_lower_triangle(n, distances))
    }

    /// Grid columns `j` (1-based) admitted by the band in grid row `i` (1-based).
    fn band_columns(&self, i: usize, n: usize) -> Range<usize> {
        let cols = self.constraint.column_range(i - 1, n);
        cols.start + 1..cols.end + 1
    }

    /// Accumulate the squared cost `D[m][n]` with two rolling rows.
    ///
    /// With `Some(threshold)` the scan stops and returns `None` once every cell
    /// of a non-final row exceeds it: any path crosses each row, so the row
    /// minimum bounds the final cost from below. Without a threshold the result
    /// is always `Some`, possibly `+inf` on overflow.
    fn accumulate(&self, a: &[f64], b: &[f64], threshold: Option<f64>) -> Option<f64> {
        let (m, n) = (a.len(), b.len());
        let mut prev = vec![f64::INFINITY; n + 1];
        let mut curr = vec![f64::INFINITY; n + 1];
        prev[0] = 0.0;

        // Columns of each buffer still holding values from an older row.
        let mut prev_written = 0..0;
        let mut curr_written = 0..0;

        for (i, &x) in a.iter().enumerate().map(|(i, x)| (i + 1, x)) {
            for cell in &mut curr[curr_written.clone()] {
                *cell = f64::INFINITY;
            }
            curr[0] = f64::INFINITY;

            let cols = self.band_columns(i, n);
            let mut row_min = f64::INFINITY;
            for j in cols.clone() {
                let best = prev[j - 1].min(prev[j]).min(curr[j - 1]);
                let value = (x - b[j - 1]).powi(2) + best;
                curr[j] = value;
                row_min = row_min.min(value);
            }

            if let Some(limit) = threshold
                && i < m
                && row_min > limit
            {
                return None;
            }

            curr_written = cols;
            mem::swap(&mut prev, &mut curr);
            mem::swap(&mut prev_written, &mut curr_written);
        }

        let last = prev[n];
        match threshold {
            Some(limit) if last > limit => None,
            _ => Some(last),
        }
    }
}

fn rooted(cost: f64) -> Result<DtwDistance, DtwError> {
    if cost.is_finite() {
        Ok(DtwDistance::from_squared_cost(cost))
    } else {
        Err(DtwError::NonFiniteDistance)
    }
}

/// True when no accumulated cell of the `a` x `b` grid can overflow.
///
/// Every cell costs at most `(max|a| + max|b|)^2` and a warping path visits
/// fewer than `m + n` cells; the factor of two absorbs rounding in the sums.
fn cost_is_bounded(a: &[f64], b: &[f64]) -> bool {
    let peak = |s: &[f64]| s.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    let span = peak(a) + peak(b);
    let steps = (a.len() + b.len()) as f64;
    (span * span * steps * 2.0).is_finite()
}

/// Fully materialized DTW cost grid of size `(m+1) x (n+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CostGrid {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl CostGrid {
    /// Return `(m + 1, n + 1)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Return the accumulated squared cost `D[i][j]`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is outside the grid.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.rows && j < self.cols, "cell ({i}, {j}) outside {}x{} grid", self.rows, self.cols);
        self.cells[i * self.cols + j]
    }

    /// Return the DTW distance, `sqrt(D[m][n])`.
    #[must_use]
    pub fn distance(&self) -> DtwDistance {
        DtwDistance::from_squared_cost(self.cells[self.cells.len() - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    fn dist(dtw: Dtw, a: &[f64], b: &[f64]) -> f64 {
        dtw.distance(ts(a).as_view(), ts(b).as_view()).unwrap().value()
    }

    #[test]
    fn identical_series_distance_zero() {
        assert_eq!(dist(Dtw::unconstrained(), &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn hand_computed_2x2() {
        // D[1][1] = 1, D[1][2] = 1, D[2][1] = 1, D[2][2] = 1 + 1 = 2
        let d = dist(Dtw::unconstrained(), &[0.0, 1.0], &[1.0, 0.0]);
        assert!((d - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn zero_radius_forces_diagonal() {
        let d = dist(Dtw::with_sakoe_chiba(0), &[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]);
        assert!((d - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn unequal_lengths_warp() {
        // [1,2,3] against [1,2,2,3]: the repeated 2 aligns for free.
        assert_eq!(dist(Dtw::unconstrained(), &[1.0, 2.0, 3.0], &[1.0, 2.0, 2.0, 3.0]), 0.0);
        assert_eq!(dist(Dtw::with_sakoe_chiba(1), &[1.0, 2.0, 3.0], &[1.0, 2.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn single_element_series() {
        assert!((dist(Dtw::unconstrained(), &[5.0], &[3.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn narrow_window_is_rejected() {
        let dtw = Dtw::with_sakoe_chiba(1);
        let err = dtw.distance(ts(&[1.0]).as_view(), ts(&[1.0, 2.0, 3.0]).as_view());
        assert_eq!(err, Err(DtwError::WindowTooNarrow { window: 1, len_a: 1, len_b: 3 }));
        assert!(dtw.cost_grid(ts(&[1.0]).as_view(), ts(&[1.0, 2.0, 3.0]).as_view()).is_err());
    }

    #[test]
    fn empty_slice_is_rejected() {
        let dtw = Dtw::unconstrained();
        assert_eq!(dtw.distance_slices(&[], &[1.0, 2.0, 3.0]), Err(DtwError::EmptySeries));
        assert_eq!(
            dtw.distance_slices(&[1.0], &[f64::NAN]),
            Err(DtwError::NonFiniteValue { index: 0 })
        );
    }

    #[test]
    fn cost_grid_borders_and_corner() {
        let a = ts(&[0.0, 1.0]);
        let b = ts(&[1.0, 0.0, 0.0]);
        let grid = Dtw::unconstrained().cost_grid(a.as_view(), b.as_view()).unwrap();
        assert_eq!(grid.shape(), (3, 4));
        assert_eq!(grid.get(0, 0), 0.0);
        assert!(grid.get(0, 2).is_infinite());
        assert!(grid.get(2, 0).is_infinite());
        let rolling = Dtw::unconstrained().distance(a.as_view(), b.as_view()).unwrap();
        assert!((grid.distance().value() - rolling.value()).abs() < 1e-12);
    }

    #[test]
    fn banded_grid_leaves_outside_cells_infinite() {
        let a = ts(&[1.0, 2.0, 3.0, 4.0]);
        let grid = Dtw::with_sakoe_chiba(1).cost_grid(a.as_view(), a.as_view()).unwrap();
        assert!(grid.get(1, 3).is_infinite());
        assert!(grid.get(4, 2).is_infinite());
        assert!(grid.get(2, 3).is_finite());
    }

    #[test]
    fn rolling_matches_grid_under_band() {
        let a = ts(&[1.0, 5.0, 2.0, 8.0, 3.0, 0.0]);
        let b = ts(&[2.0, 4.0, 7.0, 1.0, 1.0]);
        for r in 1..6 {
            let dtw = Dtw::with_sakoe_chiba(r);
            let rolling = dtw.distance(a.as_view(), b.as_view()).unwrap().value();
            let full = dtw.cost_grid(a.as_view(), b.as_view()).unwrap().distance().value();
            assert!((rolling - full).abs() < 1e-12, "radius {r}: {rolling} != {full}");
        }
    }

    #[test]
    fn warping_path_endpoints_and_continuity() {
        let a = ts(&[1.0, 5.0, 2.0, 8.0, 3.0]);
        let b = ts(&[2.0, 4.0, 7.0]);
        let (_, path) = Dtw::unconstrained().distance_and_path(a.as_view(), b.as_view()).unwrap();
        let steps = path.steps();
        assert_eq!(steps.first(), Some(&WarpingStep { a: 0, b: 0 }));
        assert_eq!(steps.last(), Some(&WarpingStep { a: 4, b: 2 }));
        for pair in steps.windows(2) {
            let da = pair[1].a - pair[0].a;
            let db = pair[1].b - pair[0].b;
            assert!(da <= 1 && db <= 1 && da + db >= 1);
        }
    }

    #[test]
    fn path_cost_equals_distance() {
        let a = ts(&[0.0, 3.0, 1.0, 4.0]);
        let b = ts(&[1.0, 3.0, 4.0]);
        let (d, path) = Dtw::unconstrained().distance_and_path(a.as_view(), b.as_view()).unwrap();
        let cost: f64 = path
            .into_iter()
            .map(|s| (a.as_ref()[s.a] - b.as_ref()[s.b]).powi(2))
            .sum();
        assert!((cost.sqrt() - d.value()).abs() < 1e-12);
    }

    #[test]
    fn identical_series_path_is_diagonal() {
        let a = ts(&[1.0, 2.0, 3.0]);
        let (d, path) = Dtw::with_sakoe_chiba(1).distance_and_path(a.as_view(), a.as_view()).unwrap();
        assert_eq!(d, DtwDistance::ZERO);
        assert!(path.into_iter().all(|s| s.a == s.b));
    }

    #[test]
    fn cutoff_abandons_far_pairs() {
        let a = ts(&[0.0; 5]);
        let b = ts(&[10.0; 5]);
        let dtw = Dtw::unconstrained();
        let abandoned = dtw.distance_with_cutoff(a.as_view(), b.as_view(), 1.0).unwrap();
        assert!(abandoned.is_abandoned());
        let kept = dtw.distance_with_cutoff(a.as_view(), b.as_view(), 100.0).unwrap();
        assert!((kept.value() - dtw.distance(a.as_view(), b.as_view()).unwrap().value()).abs() < 1e-12);
    }

    #[test]
    fn cutoff_equal_to_distance_keeps_it() {
        let a = ts(&[0.0, 1.0, 2.0]);
        let b = ts(&[2.0, 1.0, 0.5]);
        let dtw = Dtw::unconstrained();
        let exact = dtw.distance(a.as_view(), b.as_view()).unwrap();
        let at = dtw.distance_with_cutoff(a.as_view(), b.as_view(), exact.value()).unwrap();
        assert_eq!(at, exact);
        let below = dtw
            .distance_with_cutoff(a.as_view(), b.as_view(), exact.value() - 1e-6)
            .unwrap();
        assert!(below.is_abandoned());
        let negative = dtw.distance_with_cutoff(a.as_view(), a.as_view(), -1.0).unwrap();
        assert!(negative.is_abandoned());
    }

    #[test]
    fn overflowing_cost_is_an_error_not_infinity() {
        let a = ts(&[0.0]);
        let b = ts(&[1e200]);
        let dtw = Dtw::unconstrained();
        assert_eq!(dtw.distance(a.as_view(), b.as_view()), Err(DtwError::NonFiniteDistance));
        assert_eq!(
            dtw.distance_with_cutoff(a.as_view(), b.as_view(), 0.0),
            Err(DtwError::NonFiniteDistance)
        );
        assert_eq!(dtw.cost_grid(a.as_view(), b.as_view()), Err(DtwError::NonFiniteDistance));
        assert!(dtw.distance_and_path(a.as_view(), b.as_view()).is_err());
        assert!(matches!(dtw.pairwise(&[a, b]), Err(DtwError::NonFiniteDistance)));
    }

    #[test]
    fn large_but_representable_cost_is_returned() {
        let a = ts(&[0.0, 0.0]);
        let b = ts(&[1e150, 1e150]);
        let d = Dtw::unconstrained().distance(a.as_view(), b.as_view()).unwrap();
        assert!((d.value() / (2.0_f64.sqrt() * 1e150) - 1.0).abs() < 1e-12);
        let cut = Dtw::unconstrained()
            .distance_with_cutoff(a.as_view(), b.as_view(), 1.0)
            .unwrap();
        assert!(cut.is_abandoned());
    }

    #[test]
    fn cost_bound_flags_near_max_inputs() {
        assert!(cost_is_bounded(&[1.0, -3.0], &[2.0]));
        assert!(!cost_is_bounded(&[f64::MAX], &[0.0]));
        assert!(!cost_is_bounded(&[1e200], &[0.0]));
    }

    #[test]
    fn pairwise_matches_individual() {
        let series = vec![ts(&[1.0, 2.0, 3.0]), ts(&[4.0, 5.0, 6.0]), ts(&[1.0, 3.0, 2.0, 2.0])];
        let dtw = Dtw::unconstrained();
        let matrix = dtw.pairwise(&series).unwrap();
        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            for j in 0..3 {
                let direct = dtw.distance(series[i].as_view(), series[j].as_view()).unwrap();
                assert!((matrix.get(i, j).value() - direct.value()).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn pairwise_handles_degenerate_sizes() {
        let dtw = Dtw::unconstrained();
        assert!(dtw.pairwise(&[]).unwrap().is_empty());
        let single = dtw.pairwise(&[ts(&[1.0])]).unwrap();
        assert_eq!(single.get(0, 0), DtwDistance::ZERO);
    }

    #[test]
    fn pairwise_propagates_window_errors() {
        let series = vec![ts(&[1.0]), ts(&[1.0, 2.0, 3.0, 4.0])];
        let result = Dtw::with_sakoe_chiba(2).pairwise(&series);
        assert!(matches!(result, Err(DtwError::WindowTooNarrow { .. })));
    }
}
