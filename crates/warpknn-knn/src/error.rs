//! Error types for k-NN fitting, prediction, tuning, and persistence.

use std::path::PathBuf;

use warpknn_dtw::DtwError;

/// Coarse classification of a [`KnnError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty series, invalid `k`, mismatched batch sizes.
    InvalidInput,
    /// Prediction or persistence attempted before `fit`.
    NotFitted,
    /// Warping window narrower than the length gap of a compared pair.
    WindowConstraint,
    /// A cancellation token stopped a batch.
    Cancelled,
    /// Model file could not be read, written, or decoded.
    Io,
}

/// Errors from the DTW k-NN classifier.
#[derive(Debug, thiserror::Error)]
pub enum KnnError {
    /// Returned when `k` is zero.
    #[error("k must be at least 1, got {k}")]
    InvalidK {
        /// The invalid k value provided.
        k: usize,
    },

    /// Returned when `k` is larger than the reference set.
    #[error("k = {k} exceeds the number of reference examples ({n_examples})")]
    KExceedsExamples {
        /// The requested number of neighbors.
        k: usize,
        /// Number of examples passed to `fit`.
        n_examples: usize,
    },

    /// Returned when `fit` receives no examples.
    #[error("reference set must contain at least one example")]
    EmptyReferenceSet,

    /// Returned when scoring an empty batch.
    #[error("query batch is empty")]
    EmptyQueries,

    /// Returned when queries and true labels differ in count.
    #[error("got {n_queries} queries but {n_labels} labels")]
    LengthMismatch {
        /// Number of query series.
        n_queries: usize,
        /// Number of true labels.
        n_labels: usize,
    },

    /// Returned when a series is empty or holds non-finite values.
    #[error("invalid series: {0}")]
    InvalidSeries(#[source] DtwError),

    /// Returned when a query and a reference are finite but far enough apart
    /// that their DTW cost overflows `f64`.
    #[error("DTW distance overflowed; rescale or z-normalize the series")]
    NonFiniteDistance,

    /// Returned when predicting or saving before `fit`.
    #[error("classifier has not been fitted")]
    NotFitted,

    /// Returned when the warping window cannot align a query with a reference.
    #[error("warping window constraint violated: {0}")]
    WindowConstraint(#[source] DtwError),

    /// Returned when a [`CancellationToken`](crate::CancellationToken) fires mid-batch.
    #[error("batch prediction was cancelled")]
    Cancelled,

    /// Returned when a grid search has no `k` values or no windows.
    #[error("grid search needs at least one k and one window")]
    EmptyGrid,

    /// Returned when the hold-out fraction is not in (0.0, 1.0).
    #[error("hold-out fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidHoldoutFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when there are too few examples to split off a hold-out set.
    #[error("need at least 2 examples to split off a hold-out set, got {n_examples}")]
    TooFewExamplesForHoldout {
        /// Number of examples provided.
        n_examples: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the model file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the model file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model written with a different format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the file.
        found: u32,
        /// Path to the model file.
        path: PathBuf,
    },

    /// Returned when a model file's recorded reference count disagrees with
    /// the references it holds.
    #[error("model in {path} records {expected} references but holds {found}")]
    ReferenceCountMismatch {
        /// The count recorded in the file.
        expected: usize,
        /// The number of references actually decoded.
        found: usize,
        /// Path to the model file.
        path: PathBuf,
    },
}

impl KnnError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFitted => ErrorKind::NotFitted,
            Self::WindowConstraint(_) => ErrorKind::WindowConstraint,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::SerializeModel { .. }
            | Self::DeserializeModel { .. }
            | Self::WriteModel { .. }
            | Self::ReadModel { .. }
            | Self::IncompatibleModelVersion { .. }
            | Self::ReferenceCountMismatch { .. } => ErrorKind::Io,
            _ => ErrorKind::InvalidInput,
        }
    }
}

impl From<DtwError> for KnnError {
    fn from(err: DtwError) -> Self {
        match err {
            DtwError::WindowTooNarrow { .. } => Self::WindowConstraint(err),
            DtwError::NonFiniteDistance => Self::NonFiniteDistance,
            DtwError::EmptySeries | DtwError::NonFiniteValue { .. } => Self::InvalidSeries(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtw_errors_map_to_kinds() {
        let narrow = KnnError::from(DtwError::WindowTooNarrow { window: 0, len_a: 1, len_b: 2 });
        assert_eq!(narrow.kind(), ErrorKind::WindowConstraint);
        assert_eq!(KnnError::from(DtwError::EmptySeries).kind(), ErrorKind::InvalidInput);
        assert_eq!(
            KnnError::from(DtwError::NonFiniteValue { index: 3 }).kind(),
            ErrorKind::InvalidInput
        );
        let overflow = KnnError::from(DtwError::NonFiniteDistance);
        assert!(matches!(overflow, KnnError::NonFiniteDistance));
        assert_eq!(overflow.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn validation_errors_are_invalid_input() {
        assert_eq!(KnnError::InvalidK { k: 0 }.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            KnnError::LengthMismatch { n_queries: 2, n_labels: 1 }.kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(KnnError::NotFitted.kind(), ErrorKind::NotFitted);
        assert_eq!(KnnError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
