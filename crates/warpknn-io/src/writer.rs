//! JSON result writer for classification, tuning, and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};
use warpknn_knn::{CandidateScore, ClassMetrics, ConfusionMatrix, GridSearchResult};

use crate::IoError;
use crate::domain::ExperimentName;

/// Settings and sizes of a fit-and-score run, echoed into the classify artifact.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRun<'a> {
    /// Dataset name.
    pub dataset: &'a str,
    /// Number of neighbors.
    pub k: usize,
    /// Sakoe-Chiba radius, `None` for unconstrained.
    pub window: Option<usize>,
    /// Whether series were z-normalized before fitting.
    pub z_normalized: bool,
    /// Number of training instances.
    pub n_train: usize,
    /// Number of test instances.
    pub n_test: usize,
}

/// Settings and sizes of a grid search, echoed into the tune artifact.
#[derive(Debug, Clone, Copy)]
pub struct TuneRun<'a> {
    /// Dataset name.
    pub dataset: &'a str,
    /// Fraction of the training split held out for validation.
    pub holdout_fraction: f64,
    /// Seed of the hold-out shuffle.
    pub seed: u64,
    /// Instances used to fit each candidate.
    pub n_fit: usize,
    /// Instances used to score each candidate.
    pub n_validation: usize,
    /// Test accuracy of the best candidate refit on the full training split.
    pub test_accuracy: Option<f64>,
}

/// Writes result artifacts to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_classify.json`,
/// `{experiment}_tune.json`, and `{experiment}_predictions.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json(&self, path: PathBuf, artifact: &impl Serialize) -> Result<PathBuf, IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::SerializeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Write a fit-and-score result to `{experiment}_classify.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all)]
    pub fn write_classify(
        &self,
        run: &ClassifyRun<'_>,
        confusion: &ConfusionMatrix<String>,
    ) -> Result<PathBuf, IoError> {
        let artifact = ClassifyArtifact {
            experiment: self.experiment.as_str(),
            dataset: run.dataset,
            k: run.k,
            window: run.window,
            z_normalized: run.z_normalized,
            n_train: run.n_train,
            n_test: run.n_test,
            accuracy: confusion.accuracy(),
            error_rate: 1.0 - confusion.accuracy(),
            classes: confusion.classes(),
            confusion_matrix: confusion.as_rows(),
            class_metrics: confusion.class_metrics(),
        };
        let path = self.write_json(self.artifact_path("classify.json"), &artifact)?;
        info!(path = %path.display(), "classification result written");
        Ok(path)
    }

    /// Write a grid-search result to `{experiment}_tune.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all)]
    pub fn write_tune(
        &self,
        run: &TuneRun<'_>,
        result: &GridSearchResult,
    ) -> Result<PathBuf, IoError> {
        let artifact = TuneArtifact {
            experiment: self.experiment.as_str(),
            dataset: run.dataset,
            holdout_fraction: run.holdout_fraction,
            seed: run.seed,
            n_fit: run.n_fit,
            n_validation: run.n_validation,
            best: result.best(),
            test_accuracy: run.test_accuracy,
            candidates: &result.candidates,
        };
        let path = self.write_json(self.artifact_path("tune.json"), &artifact)?;
        info!(path = %path.display(), "tuning result written");
        Ok(path)
    }

    /// Write predictions to `{experiment}_predictions.json`.
    ///
    /// When `truth` is given, each entry also carries the true label and the
    /// artifact records overall accuracy.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeJson`] | JSON encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip_all, fields(n_predictions = predicted.len()))]
    pub fn write_predictions(
        &self,
        predicted: &[String],
        truth: Option<&[String]>,
    ) -> Result<PathBuf, IoError> {
        let entries: Vec<PredictionEntry<'_>> = predicted
            .iter()
            .enumerate()
            .map(|(index, label)| PredictionEntry {
                index,
                predicted: label,
                actual: truth.and_then(|t| t.get(index)).map(String::as_str),
            })
            .collect();
        let accuracy = truth.and_then(|t| warpknn_knn::accuracy(predicted, t).ok());

        let artifact = PredictionsArtifact {
            experiment: self.experiment.as_str(),
            n_predictions: predicted.len(),
            accuracy,
            predictions: entries,
        };
        let path = self.write_json(self.artifact_path("predictions.json"), &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_path("model.bin")
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ClassifyArtifact<'a> {
    experiment: &'a str,
    dataset: &'a str,
    k: usize,
    window: Option<usize>,
    z_normalized: bool,
    n_train: usize,
    n_test: usize,
    accuracy: f64,
    error_rate: f64,
    classes: &'a [String],
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassMetrics<String>>,
}

#[derive(Serialize)]
struct TuneArtifact<'a> {
    experiment: &'a str,
    dataset: &'a str,
    holdout_fraction: f64,
    seed: u64,
    n_fit: usize,
    n_validation: usize,
    best: Option<&'a CandidateScore>,
    test_accuracy: Option<f64>,
    candidates: &'a [CandidateScore],
}

#[derive(Serialize)]
struct PredictionsArtifact<'a> {
    experiment: &'a str,
    n_predictions: usize,
    accuracy: Option<f64>,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    index: usize,
    predicted: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<&'a str>,
}
