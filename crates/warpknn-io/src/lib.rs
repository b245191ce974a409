//! Dataset reading, validation, and result serialization for warpknn.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{Dataset, DatasetName, ExperimentName, Split};
pub use error::IoError;
pub use reader::{Delimiter, UcrReader};
pub use writer::{ClassifyRun, ResultWriter, TuneRun};
