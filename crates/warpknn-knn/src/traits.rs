//! Common interface for time-series classifiers.

use warpknn_dtw::{TimeSeries, TimeSeriesView};

use crate::error::KnnError;
use crate::example::{Label, LabeledExample};
use crate::metrics::accuracy;

/// A classifier fitted on labeled series that predicts labels for new ones.
pub trait TimeSeriesClassifier<L: Label> {
    /// Fit on `examples`, replacing any earlier fit.
    ///
    /// # Errors
    ///
    /// Implementation-specific validation failures.
    fn fit(&mut self, examples: Vec<LabeledExample<L>>, k: usize) -> Result<(), KnnError>;

    /// Predict the label of one series.
    ///
    /// # Errors
    ///
    /// [`KnnError::NotFitted`] before `fit`, or implementation-specific failures.
    fn predict(&self, query: TimeSeriesView<'_>) -> Result<L, KnnError>;

    /// Predict labels for a batch, in input order.
    ///
    /// # Errors
    ///
    /// The first error any query produces.
    fn predict_batch(&self, queries: &[TimeSeries]) -> Result<Vec<L>, KnnError> {
        queries.iter().map(|q| self.predict(q.as_view())).collect()
    }

    /// Fraction of `queries` whose prediction equals the matching entry of `labels`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::LengthMismatch`] | `queries.len() != labels.len()` |
    /// | [`KnnError::EmptyQueries`] | no queries |
    fn score(&self, queries: &[TimeSeries], labels: &[L]) -> Result<f64, KnnError> {
        if queries.len() != labels.len() {
            return Err(KnnError::LengthMismatch {
                n_queries: queries.len(),
                n_labels: labels.len(),
            });
        }
        if queries.is_empty() {
            return Err(KnnError::EmptyQueries);
        }
        let predicted = self.predict_batch(queries)?;
        accuracy(&predicted, labels)
    }
}
