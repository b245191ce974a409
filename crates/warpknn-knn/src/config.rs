//! Configuration builder for the DTW k-NN classifier.

use warpknn_dtw::{BandConstraint, Dtw};

use crate::classifier::DtwKnnClassifier;
use crate::error::KnnError;
use crate::example::{Label, LabeledExample};

/// Configuration for a [`DtwKnnClassifier`].
///
/// Construct via [`KnnConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter    | Default                          |
/// |--------------|----------------------------------|
/// | `constraint` | `BandConstraint::Unconstrained`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnnConfig {
    pub(crate) k: usize,
    pub(crate) constraint: BandConstraint,
}

impl KnnConfig {
    /// Create a configuration voting over `k` neighbors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::InvalidK`] | `k` is zero |
    pub fn new(k: usize) -> Result<Self, KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidK { k });
        }
        Ok(Self {
            k,
            constraint: BandConstraint::Unconstrained,
        })
    }

    /// Set a Sakoe-Chiba radius, or `None` for unconstrained DTW.
    #[must_use]
    pub fn with_window(mut self, window: Option<usize>) -> Self {
        self.constraint = BandConstraint::from_window(window);
        self
    }

    /// Set the band constraint directly.
    #[must_use]
    pub fn with_constraint(mut self, constraint: BandConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Return the number of neighbors.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the band constraint.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Build a classifier with this configuration and fit it on `examples`.
    ///
    /// # Errors
    ///
    /// Same as [`DtwKnnClassifier::fit`].
    pub fn fit<L: Label>(
        &self,
        examples: Vec<LabeledExample<L>>,
    ) -> Result<DtwKnnClassifier<L>, KnnError> {
        let mut classifier = DtwKnnClassifier::new(Dtw::from_constraint(self.constraint));
        classifier.fit(examples, self.k)?;
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_k() {
        assert!(matches!(KnnConfig::new(0), Err(KnnError::InvalidK { k: 0 })));
    }

    #[test]
    fn builder_sets_window() {
        let config = KnnConfig::new(3).unwrap().with_window(Some(4));
        assert_eq!(config.k(), 3);
        assert_eq!(config.constraint(), BandConstraint::SakoeChibaRadius(4));
        assert_eq!(
            config.with_window(None).constraint(),
            BandConstraint::Unconstrained
        );
    }
}
