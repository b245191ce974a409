//! k-nearest-neighbor classification of time series under DTW.
//!
//! [`DtwKnnClassifier`] stores a labeled reference set and predicts by
//! majority vote over the `k` nearest references. Batch prediction runs
//! queries in parallel with exact early abandoning. [`GridSearch`] tunes `k`
//! and the warping window on a hold-out split, and fitted models persist to
//! disk via bincode.
//!
//! ```
//! use warpknn_dtw::TimeSeries;
//! use warpknn_knn::{KnnConfig, LabeledExample};
//!
//! let examples = vec![
//!     LabeledExample::new(TimeSeries::new(vec![0.0, 0.0, 0.0]).unwrap(), "A"),
//!     LabeledExample::new(TimeSeries::new(vec![1.0, 1.0, 1.0]).unwrap(), "B"),
//! ];
//! let clf = KnnConfig::new(1).unwrap().fit(examples).unwrap();
//! assert_eq!(clf.predict_slice(&[0.0, 0.0, 0.1]).unwrap(), "A");
//! ```

mod cancel;
mod classifier;
mod config;
mod error;
mod example;
mod metrics;
mod neighbors;
mod serialize;
mod traits;
mod tune;
mod vote;

pub use cancel::CancellationToken;
pub use classifier::DtwKnnClassifier;
pub use config::KnnConfig;
pub use error::{ErrorKind, KnnError};
pub use example::{Label, LabeledExample, ReferenceSet, zip_examples};
pub use metrics::{ClassMetrics, ConfusionMatrix, accuracy};
pub use neighbors::Neighbor;
pub use serialize::Preprocessing;
pub use traits::TimeSeriesClassifier;
pub use tune::{
    Candidate, CandidateOutcome, CandidateScore, GridSearch, GridSearchResult, holdout_split,
};
