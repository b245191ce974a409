//! DTW k-nearest-neighbor classifier.

use rayon::prelude::*;
use tracing::{debug, info, instrument};
use warpknn_dtw::{BandConstraint, Dtw, DtwDistance, TimeSeries, TimeSeriesView};

use crate::cancel::CancellationToken;
use crate::error::KnnError;
use crate::example::{Label, LabeledExample, ReferenceSet};
use crate::neighbors::{Neighbor, NeighborBuffer, nearest_indices};
use crate::traits::TimeSeriesClassifier;
use crate::vote::majority_vote;

/// k-NN classifier over a DTW distance.
///
/// Starts unfitted. [`fit`](Self::fit) stores the reference set and `k`;
/// every prediction method returns [`KnnError::NotFitted`] until then.
/// A fitted classifier is read-only and can predict from many threads.
#[derive(Debug, Clone)]
pub struct DtwKnnClassifier<L> {
    dtw: Dtw,
    fitted: Option<Fitted<L>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Fitted<L> {
    pub(crate) k: usize,
    pub(crate) references: ReferenceSet<L>,
}

impl<L: Label> Fitted<L> {
    fn neighbors(&self, picks: impl IntoIterator<Item = (usize, DtwDistance)>) -> Vec<Neighbor<'_, L>> {
        picks
            .into_iter()
            .map(|(index, distance)| Neighbor {
                index,
                distance,
                label: &self.references.examples()[index].label,
            })
            .collect()
    }

    /// First reference, in index order, that the window cannot align with `query`.
    ///
    /// Both searches run this before any distance, so a query that breaks the
    /// window and also overflows reports the same error on either path.
    fn admit(&self, dtw: Dtw, query: TimeSeriesView<'_>) -> Result<(), KnnError> {
        let constraint = dtw.constraint();
        for example in self.references.examples() {
            constraint.admits(query.len(), example.series.len())?;
        }
        Ok(())
    }

    /// Distances to every reference in parallel, then the k smallest.
    fn search_exhaustive(
        &self,
        dtw: Dtw,
        query: TimeSeriesView<'_>,
    ) -> Result<Vec<Neighbor<'_, L>>, KnnError> {
        self.admit(dtw, query)?;
        let distances = self
            .references
            .examples()
            .par_iter()
            .map(|example| dtw.distance(query, example.series.as_view()))
            .collect::<Result<Vec<_>, _>>()?;
        let nearest = nearest_indices(&distances, self.k);
        Ok(self.neighbors(nearest.into_iter().map(|i| (i, distances[i]))))
    }

    /// Sequential scan that abandons references which cannot enter the top k.
    fn search_pruned(
        &self,
        dtw: Dtw,
        query: TimeSeriesView<'_>,
    ) -> Result<Vec<Neighbor<'_, L>>, KnnError> {
        self.admit(dtw, query)?;
        let mut buffer = NeighborBuffer::new(self.k);
        for (index, example) in self.references.examples().iter().enumerate() {
            let distance = dtw.distance_with_cutoff(query, example.series.as_view(), buffer.cutoff())?;
            buffer.offer(index, distance);
        }
        Ok(self.neighbors(buffer.into_sorted()))
    }

    fn decide(&self, neighbors: &[Neighbor<'_, L>]) -> Result<L, KnnError> {
        majority_vote(neighbors, &self.references)
            .cloned()
            .ok_or(KnnError::EmptyReferenceSet)
    }
}

impl<L> Default for DtwKnnClassifier<L> {
    fn default() -> Self {
        Self::new(Dtw::unconstrained())
    }
}

impl<L> DtwKnnClassifier<L> {
    /// Create an unfitted classifier measuring distance with `dtw`.
    #[must_use]
    pub fn new(dtw: Dtw) -> Self {
        Self { dtw, fitted: None }
    }

    /// Create an unfitted classifier with an optional Sakoe-Chiba radius.
    #[must_use]
    pub fn with_window(window: Option<usize>) -> Self {
        Self::new(Dtw::from_constraint(BandConstraint::from_window(window)))
    }

    /// Return the DTW configuration.
    #[must_use]
    pub fn dtw(&self) -> Dtw {
        self.dtw
    }

    /// Return `k`, or `None` before `fit`.
    #[must_use]
    pub fn k(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.k)
    }

    /// Return the fitted reference set, or `None` before `fit`.
    #[must_use]
    pub fn references(&self) -> Option<&ReferenceSet<L>> {
        self.fitted.as_ref().map(|f| &f.references)
    }

    /// Return true once `fit` has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fitted(&self) -> Result<&Fitted<L>, KnnError> {
        self.fitted.as_ref().ok_or(KnnError::NotFitted)
    }
}

impl<L: Label> DtwKnnClassifier<L> {
    /// Store `examples` as the reference set and vote over `k` neighbors.
    ///
    /// Replaces any earlier fit. On error the classifier keeps its previous
    /// state. Window compatibility is not checked here: a query whose length
    /// the window cannot bridge fails at prediction time.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::InvalidK`] | `k` is zero |
    /// | [`KnnError::EmptyReferenceSet`] | `examples` is empty |
    /// | [`KnnError::KExceedsExamples`] | `k > examples.len()` |
    pub fn fit(&mut self, examples: Vec<LabeledExample<L>>, k: usize) -> Result<(), KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidK { k });
        }
        if examples.is_empty() {
            return Err(KnnError::EmptyReferenceSet);
        }
        if k > examples.len() {
            return Err(KnnError::KExceedsExamples {
                k,
                n_examples: examples.len(),
            });
        }

        let references = ReferenceSet::new(examples);
        info!(
            n_references = references.len(),
            n_classes = references.classes().len(),
            k,
            constraint = %self.dtw.constraint(),
            "classifier fitted"
        );
        self.fitted = Some(Fitted { k, references });
        Ok(())
    }

    /// Return the `k` nearest references to `query`, nearest first.
    ///
    /// Equal distances are ordered by reference insertion index.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::NotFitted`] | called before `fit` |
    /// | [`KnnError::WindowConstraint`] | window cannot bridge the query and some reference |
    /// | [`KnnError::NonFiniteDistance`] | the distance to some reference overflows |
    pub fn kneighbors(&self, query: TimeSeriesView<'_>) -> Result<Vec<Neighbor<'_, L>>, KnnError> {
        self.fitted()?.search_exhaustive(self.dtw, query)
    }

    /// Predict the label of `query` by majority vote of its `k` nearest references.
    ///
    /// Vote ties go to the label with the smaller mean neighbor distance, then
    /// to the label that appears first in the reference set.
    ///
    /// # Errors
    ///
    /// Same as [`kneighbors`](Self::kneighbors).
    pub fn predict(&self, query: TimeSeriesView<'_>) -> Result<L, KnnError> {
        let fitted = self.fitted()?;
        let neighbors = fitted.search_exhaustive(self.dtw, query)?;
        fitted.decide(&neighbors)
    }

    /// Validate a raw slice and predict its label.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::InvalidSeries`] | `values` is empty or non-finite |
    /// | [`KnnError::NotFitted`] | called before `fit` |
    /// | [`KnnError::WindowConstraint`] | window cannot bridge the query and some reference |
    /// | [`KnnError::NonFiniteDistance`] | the distance to some reference overflows |
    pub fn predict_slice(&self, values: &[f64]) -> Result<L, KnnError> {
        self.predict(TimeSeriesView::new(values)?)
    }

    /// Predict labels for a batch of queries, in input order.
    ///
    /// Queries run in parallel. Each query scans references in order with an
    /// early-abandoning DTW bounded by its current k-th best distance, which
    /// yields exactly the labels [`predict`](Self::predict) would.
    ///
    /// # Errors
    ///
    /// Same as [`kneighbors`](Self::kneighbors).
    #[instrument(skip_all, fields(n_queries = queries.len()))]
    pub fn predict_batch(&self, queries: &[TimeSeries]) -> Result<Vec<L>, KnnError> {
        self.predict_batch_inner(queries, None)
    }

    /// [`predict_batch`](Self::predict_batch) that stops once `token` is cancelled.
    ///
    /// The token is checked before each query starts.
    ///
    /// # Errors
    ///
    /// [`KnnError::Cancelled`] if the token fires before every query has
    /// started, otherwise the same as [`predict_batch`](Self::predict_batch).
    #[instrument(skip_all, fields(n_queries = queries.len()))]
    pub fn predict_batch_cancellable(
        &self,
        queries: &[TimeSeries],
        token: &CancellationToken,
    ) -> Result<Vec<L>, KnnError> {
        self.predict_batch_inner(queries, Some(token))
    }

    fn predict_batch_inner(
        &self,
        queries: &[TimeSeries],
        token: Option<&CancellationToken>,
    ) -> Result<Vec<L>, KnnError> {
        let fitted = self.fitted()?;
        let predictions = queries
            .par_iter()
            .map(|query| {
                if token.is_some_and(CancellationToken::is_cancelled) {
                    return Err(KnnError::Cancelled);
                }
                let neighbors = fitted.search_pruned(self.dtw, query.as_view())?;
                fitted.decide(&neighbors)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(n_predictions = predictions.len(), "batch predicted");
        Ok(predictions)
    }

    /// Fraction of `queries` predicted as the matching entry of `labels`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::LengthMismatch`] | `queries.len() != labels.len()` |
    /// | [`KnnError::EmptyQueries`] | no queries |
    ///
    /// plus anything [`predict_batch`](Self::predict_batch) returns.
    pub fn score(&self, queries: &[TimeSeries], labels: &[L]) -> Result<f64, KnnError> {
        <Self as TimeSeriesClassifier<L>>::score(self, queries, labels)
    }
}

impl<L: Label> TimeSeriesClassifier<L> for DtwKnnClassifier<L> {
    fn fit(&mut self, examples: Vec<LabeledExample<L>>, k: usize) -> Result<(), KnnError> {
        DtwKnnClassifier::fit(self, examples, k)
    }

    fn predict(&self, query: TimeSeriesView<'_>) -> Result<L, KnnError> {
        DtwKnnClassifier::predict(self, query)
    }

    fn predict_batch(&self, queries: &[TimeSeries]) -> Result<Vec<L>, KnnError> {
        DtwKnnClassifier::predict_batch(self, queries)
    }
}
