//! Domain types for warpknn-io.

use std::fmt;
use std::str::FromStr;

use warpknn_dtw::TimeSeries;
use warpknn_knn::{LabeledExample, zip_examples};

use crate::IoError;

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A validated dataset name, used as a directory and file-name stem.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetName(String);

impl DatasetName {
    /// Parse and validate a dataset name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidDatasetName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if !is_safe_name(&name) {
            return Err(IoError::InvalidDatasetName { name });
        }
        Ok(Self(name))
    }

    /// Return the dataset name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if !is_safe_name(&name) {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which half of a train/test archive to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    /// The `TRAIN` file.
    Train,
    /// The `TEST` file.
    Test,
}

impl Split {
    /// Return the upper-case file-name suffix.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "TRAIN",
            Self::Test => "TEST",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRAIN" => Ok(Self::Train),
            "TEST" => Ok(Self::Test),
            _ => Err(IoError::InvalidSplit { split: s.to_string() }),
        }
    }
}

/// A labeled univariate dataset.
///
/// Labels and series are stored in parallel vectors: `labels[i]` belongs to
/// `series[i]`. Series lengths may differ.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Class labels in file row order.
    pub labels: Vec<String>,
    /// Validated series in the same order as `labels`.
    pub series: Vec<TimeSeries>,
}

impl Dataset {
    /// Return the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Return true if the dataset has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Return the distinct labels in order of first appearance.
    #[must_use]
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        for label in &self.labels {
            if !classes.contains(&label.as_str()) {
                classes.push(label.as_str());
            }
        }
        classes
    }

    /// Return the shortest and longest series length.
    #[must_use]
    pub fn length_range(&self) -> Option<(usize, usize)> {
        let min = self.series.iter().map(TimeSeries::len).min()?;
        let max = self.series.iter().map(TimeSeries::len).max()?;
        Some((min, max))
    }

    /// Pair every series with its label.
    #[must_use]
    pub fn into_examples(self) -> Vec<LabeledExample<String>> {
        zip_examples(self.series, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("my-experiment_01".to_string());
        assert_eq!(name.unwrap().as_str(), "my-experiment_01");
    }

    #[test]
    fn names_reject_empty_and_special_chars() {
        assert!(matches!(
            ExperimentName::new(String::new()),
            Err(IoError::InvalidExperimentName { .. })
        ));
        assert!(matches!(
            DatasetName::new("../GunPoint".to_string()),
            Err(IoError::InvalidDatasetName { .. })
        ));
        assert_eq!(DatasetName::new("GunPoint".into()).unwrap().to_string(), "GunPoint");
    }

    #[test]
    fn split_parses_case_insensitively() {
        assert_eq!("train".parse::<Split>().unwrap(), Split::Train);
        assert_eq!("TEST".parse::<Split>().unwrap().as_str(), "TEST");
        assert!(matches!("valid".parse::<Split>(), Err(IoError::InvalidSplit { .. })));
    }

    #[test]
    fn dataset_summaries() {
        let dataset = Dataset {
            labels: vec!["2".into(), "1".into(), "2".into()],
            series: vec![
                TimeSeries::new(vec![0.0, 1.0]).unwrap(),
                TimeSeries::new(vec![0.0]).unwrap(),
                TimeSeries::new(vec![0.0, 1.0, 2.0]).unwrap(),
            ],
        };
        assert_eq!(dataset.classes(), vec!["2", "1"]);
        assert_eq!(dataset.length_range(), Some((1, 3)));

        let examples = dataset.into_examples();
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[1].label, "1");
    }
}
