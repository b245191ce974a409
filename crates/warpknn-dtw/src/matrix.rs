//! Symmetric pairwise distance matrix.

use crate::distance::DtwDistance;

/// Symmetric distance matrix stored as a flat strict lower triangle.
///
/// Pair `(row, col)` with `row > col` lives at `row * (row - 1) / 2 + col`.
/// The diagonal is implicit and always zero.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    lower: Vec<DtwDistance>,
}

impl DistanceMatrix {
    pub(crate) fn from_lower_triangle(n: usize, lower: Vec<DtwDistance>) -> Self {
        debug_assert_eq!(lower.len(), n * n.saturating_sub(1) / 2);
        Self { n, lower }
    }

    /// Return the number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the matrix covers no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the distance between series `i` and `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()` or `j >= len()`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> DtwDistance {
        assert!(i < self.n && j < self.n, "index ({i}, {j}) out of bounds for {} series", self.n);
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => DtwDistance::ZERO,
            std::cmp::Ordering::Greater => self.lower[i * (i - 1) / 2 + j],
            std::cmp::Ordering::Less => self.lower[j * (j - 1) / 2 + i],
        }
    }

    /// Return the distances from series `i` to every series, itself included.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<DtwDistance> {
        (0..self.n).map(|j| self.get(i, j)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistanceMatrix {
        // (1,0), (2,0), (2,1)
        let lower = [1.0, 2.0, 3.0].map(DtwDistance::new).to_vec();
        DistanceMatrix::from_lower_triangle(3, lower)
    }

    #[test]
    fn access_is_symmetric_with_zero_diagonal() {
        let m = sample();
        for i in 0..3 {
            assert_eq!(m.get(i, i), DtwDistance::ZERO);
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert_eq!(m.get(2, 1).value(), 3.0);
    }

    #[test]
    fn row_lists_all_columns() {
        let row: Vec<f64> = sample().row(1).into_iter().map(DtwDistance::value).collect();
        assert_eq!(row, vec![1.0, 0.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_range_panics() {
        let _ = sample().get(3, 0);
    }
}
