//! Dynamic Time Warping distance for univariate time series.
//!
//! Pure math library with zero I/O. Provides DTW distance with an optional
//! Sakoe-Chiba window, exact early abandoning, the full cost grid, warping
//! path traceback, parallel pairwise matrices, and z-normalization.
//!
//! ```
//! use warpknn_dtw::{Dtw, TimeSeries};
//!
//! let a = TimeSeries::new(vec![0.0, 1.0, 2.0]).unwrap();
//! let b = TimeSeries::new(vec![0.0, 1.0, 1.0, 2.0]).unwrap();
//! let d = Dtw::unconstrained().distance(a.as_view(), b.as_view()).unwrap();
//! assert_eq!(d.value(), 0.0);
//! ```

mod constraint;
mod distance;
mod dtw;
mod error;
mod matrix;
mod path;
mod preprocess;
mod series;

pub use constraint::BandConstraint;
pub use distance::DtwDistance;
pub use dtw::{CostGrid, Dtw};
pub use error::{DtwError, PreprocessError};
pub use matrix::DistanceMatrix;
pub use path::{WarpingPath, WarpingStep};
pub use preprocess::{z_normalize, z_normalize_batch};
pub use series::{TimeSeries, TimeSeriesView};
