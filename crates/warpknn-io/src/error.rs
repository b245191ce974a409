//! I/O error types for warpknn-io.

use std::path::PathBuf;

/// Errors from dataset reading and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the data file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the file holds no data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the data file.
        path: PathBuf,
    },

    /// Returned when a row's label cell is blank.
    #[error("empty label in {path}: row {row_index}")]
    EmptyLabel {
        /// Path to the data file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when a row has a label but no values once padding is trimmed.
    #[error("empty series in {path}: row {row_index} has no values")]
    EmptySeries {
        /// Path to the data file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
    },

    /// Returned when a value before the trailing padding is NaN, infinite, or unparseable.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the data file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based value index (excluding the label column).
        col_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the dataset name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid dataset name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidDatasetName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when a split name is neither `TRAIN` nor `TEST`.
    #[error("invalid split \"{split}\": expected TRAIN or TEST")]
    InvalidSplit {
        /// The unrecognized split.
        split: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be encoded as JSON.
    #[error("cannot encode JSON for {path}")]
    SerializeJson {
        /// Destination path.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
