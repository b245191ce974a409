//! Error types for DTW computation and series preprocessing.

/// Errors from DTW distance computation and time series validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DtwError {
    /// Returned when an empty slice is provided as a time series.
    #[error("time series must be non-empty")]
    EmptySeries,

    /// Returned when a time series contains NaN, infinity, or negative infinity.
    #[error("time series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when the Sakoe-Chiba radius is smaller than the length
    /// difference of the two series, so no warping path can reach the final cell.
    #[error("warping window {window} is too narrow for series of lengths {len_a} and {len_b}")]
    WindowTooNarrow {
        /// The configured band radius.
        window: usize,
        /// Length of the first series.
        len_a: usize,
        /// Length of the second series.
        len_b: usize,
    },

    /// Returned when the accumulated squared cost of finite inputs overflows
    /// `f64`, so the distance cannot be represented.
    #[error("DTW distance is not finite: accumulated cost overflowed")]
    NonFiniteDistance,
}

/// Errors from series preprocessing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreprocessError {
    /// Returned when z-normalizing a series whose values are all identical.
    #[error("cannot z-normalize a constant series of length {n} (value {value})")]
    ConstantSeries {
        /// Length of the series.
        n: usize,
        /// The repeated value.
        value: f64,
    },

    /// Returned when the mean or spread of a series overflows `f64`.
    #[error("cannot z-normalize a series of length {n}: magnitude overflows")]
    Overflow {
        /// Length of the series.
        n: usize,
    },
}
