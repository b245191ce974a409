//! Warping path produced by DTW traceback.

/// One aligned pair: index `a` in the first series matched to index `b` in the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpingStep {
    /// Index in the first series.
    pub a: usize,
    /// Index in the second series.
    pub b: usize,
}

/// Monotone, continuous alignment from `(0, 0)` to `(m - 1, n - 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    pub(crate) fn new(steps: Vec<WarpingStep>) -> Self {
        Self(steps)
    }

    /// Return the aligned pairs in order.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of aligned pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path has no steps (never the case after traceback).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count steps that advance only one of the two series.
    ///
    /// Zero means the alignment is the plain diagonal (lock-step) match.
    #[must_use]
    pub fn warped_steps(&self) -> usize {
        self.0
            .windows(2)
            .filter(|w| (w[1].a == w[0].a) != (w[1].b == w[0].b))
            .count()
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(pairs: &[(usize, usize)]) -> WarpingPath {
        WarpingPath::new(pairs.iter().map(|&(a, b)| WarpingStep { a, b }).collect())
    }

    #[test]
    fn diagonal_has_no_warping() {
        let p = path(&[(0, 0), (1, 1), (2, 2)]);
        assert_eq!(p.len(), 3);
        assert_eq!(p.warped_steps(), 0);
    }

    #[test]
    fn horizontal_and_vertical_moves_count() {
        let p = path(&[(0, 0), (0, 1), (1, 2), (2, 2)]);
        assert_eq!(p.warped_steps(), 2);
        assert_eq!(p.into_iter().count(), 4);
    }
}
