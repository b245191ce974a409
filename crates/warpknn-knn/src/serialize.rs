//! Model persistence via bincode.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use warpknn_dtw::TimeSeries;

use crate::classifier::DtwKnnClassifier;
use crate::error::KnnError;
use crate::example::{Label, LabeledExample};

/// Current binary format version.
const FORMAT_VERSION: u32 = 2;

/// How reference and query series were transformed before fitting.
///
/// Stored with the model so prediction can apply the same transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// Series used as read.
    #[default]
    Raw,
    /// Each series z-normalized independently.
    ZNormalized,
}

impl Preprocessing {
    /// Map a z-normalization flag to a variant.
    #[must_use]
    pub fn from_z_normalized(z_normalized: bool) -> Self {
        if z_normalized {
            Self::ZNormalized
        } else {
            Self::Raw
        }
    }

    /// Return true for [`Preprocessing::ZNormalized`].
    #[must_use]
    pub fn is_z_normalized(self) -> bool {
        self == Self::ZNormalized
    }
}

/// Versioned envelope, borrowed side.
#[derive(Serialize)]
struct ModelEnvelopeRef<'a, L> {
    format_version: u32,
    k: usize,
    window: Option<usize>,
    preprocessing: Preprocessing,
    n_references: usize,
    references: Vec<StoredExampleRef<'a, L>>,
}

#[derive(Serialize)]
struct StoredExampleRef<'a, L> {
    values: &'a [f64],
    label: &'a L,
}

/// Versioned envelope, owned side. Field order must match [`ModelEnvelopeRef`].
#[derive(Deserialize)]
struct ModelEnvelope<L> {
    format_version: u32,
    k: usize,
    window: Option<usize>,
    preprocessing: Preprocessing,
    n_references: usize,
    references: Vec<StoredExample<L>>,
}

#[derive(Deserialize)]
struct StoredExample<L> {
    values: Vec<f64>,
    label: L,
}

impl<L: Label + Serialize> DtwKnnClassifier<L> {
    /// Save the fitted model to a binary file, recorded as [`Preprocessing::Raw`].
    ///
    /// # Errors
    ///
    /// Same as [`save_with_preprocessing`](Self::save_with_preprocessing).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KnnError> {
        self.save_with_preprocessing(path, Preprocessing::Raw)
    }

    /// Save the fitted model with the preprocessing its series went through.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::NotFitted`] | called before `fit` |
    /// | [`KnnError::SerializeModel`] | bincode encoding failed |
    /// | [`KnnError::WriteModel`] | file write failed |
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save_with_preprocessing(
        &self,
        path: impl AsRef<Path>,
        preprocessing: Preprocessing,
    ) -> Result<(), KnnError> {
        let path = path.as_ref();
        let (Some(k), Some(references)) = (self.k(), self.references()) else {
            return Err(KnnError::NotFitted);
        };

        let envelope = ModelEnvelopeRef {
            format_version: FORMAT_VERSION,
            k,
            window: self.dtw().constraint().window(),
            preprocessing,
            n_references: references.len(),
            references: references
                .examples()
                .iter()
                .map(|e| StoredExampleRef {
                    values: e.series.as_ref(),
                    label: &e.label,
                })
                .collect(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| KnnError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| KnnError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_references = references.len(),
            k,
            ?preprocessing,
            "model saved"
        );
        Ok(())
    }
}

impl<L: Label + DeserializeOwned> DtwKnnClassifier<L> {
    /// Load a model, discarding its recorded preprocessing.
    ///
    /// # Errors
    ///
    /// Same as [`load_with_preprocessing`](Self::load_with_preprocessing).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnnError> {
        Self::load_with_preprocessing(path).map(|(classifier, _)| classifier)
    }

    /// Load a model saved with [`save_with_preprocessing`](Self::save_with_preprocessing)
    /// together with the preprocessing queries must go through.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::ReadModel`] | file read failed |
    /// | [`KnnError::DeserializeModel`] | bincode decoding failed |
    /// | [`KnnError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`KnnError::ReferenceCountMismatch`] | stored count differs from stored references |
    /// | [`KnnError::InvalidSeries`] | a stored series is empty or non-finite |
    /// | [`KnnError::KExceedsExamples`] | stored `k` does not fit the stored references |
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_with_preprocessing(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Preprocessing), KnnError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| KnnError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        // The version is the leading field, so it decodes even when the rest
        // of the layout has changed.
        let found: u32 = bincode::deserialize(&bytes).map_err(|e| KnnError::DeserializeModel {
            path: path.to_path_buf(),
            source: e,
        })?;
        if found != FORMAT_VERSION {
            return Err(KnnError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found,
                path: path.to_path_buf(),
            });
        }

        let envelope: ModelEnvelope<L> =
            bincode::deserialize(&bytes).map_err(|e| KnnError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;
        if envelope.n_references != envelope.references.len() {
            return Err(KnnError::ReferenceCountMismatch {
                expected: envelope.n_references,
                found: envelope.references.len(),
                path: path.to_path_buf(),
            });
        }

        let examples = envelope
            .references
            .into_iter()
            .map(|stored| Ok(LabeledExample::new(TimeSeries::new(stored.values)?, stored.label)))
            .collect::<Result<Vec<_>, KnnError>>()?;

        let mut classifier = Self::with_window(envelope.window);
        classifier.fit(examples, envelope.k)?;

        debug!(
            format_version = envelope.format_version,
            n_references = envelope.n_references,
            k = envelope.k,
            window = ?envelope.window,
            preprocessing = ?envelope.preprocessing,
            "model loaded"
        );
        Ok((classifier, envelope.preprocessing))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind;

    fn fitted() -> DtwKnnClassifier<String> {
        let mut clf = DtwKnnClassifier::with_window(Some(2));
        clf.fit(
            vec![
                LabeledExample::new(TimeSeries::new(vec![0.0, 0.0, 0.0]).unwrap(), "A".to_string()),
                LabeledExample::new(TimeSeries::new(vec![1.0, 1.0, 1.0]).unwrap(), "B".to_string()),
                LabeledExample::new(TimeSeries::new(vec![1.1, 0.9]).unwrap(), "B".to_string()),
            ],
            1,
        )
        .unwrap();
        clf
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let clf = fitted();
        clf.save(&path).unwrap();

        let loaded: DtwKnnClassifier<String> = DtwKnnClassifier::load(&path).unwrap();
        assert_eq!(loaded.k(), Some(1));
        assert_eq!(loaded.dtw(), clf.dtw());
        assert_eq!(
            loaded.references().unwrap().examples(),
            clf.references().unwrap().examples()
        );
        for query in [[0.0, 0.1, 0.0], [0.9, 1.0, 1.0]] {
            assert_eq!(
                loaded.predict_slice(&query).unwrap(),
                clf.predict_slice(&query).unwrap()
            );
        }
    }

    #[test]
    fn unfitted_save_fails() {
        let dir = TempDir::new().unwrap();
        let clf: DtwKnnClassifier<String> = DtwKnnClassifier::default();
        let err = clf.save(dir.path().join("model.bin")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFitted);
    }

    #[test]
    fn version_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        fitted().save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[..4].copy_from_slice(&99u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let err = DtwKnnClassifier::<String>::load(&path).unwrap_err();
        assert!(matches!(
            err,
            KnnError::IncompatibleModelVersion { expected: 2, found: 99, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn preprocessing_is_recorded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let clf = fitted();

        clf.save_with_preprocessing(&path, Preprocessing::ZNormalized).unwrap();
        let (_, preprocessing) = DtwKnnClassifier::<String>::load_with_preprocessing(&path).unwrap();
        assert_eq!(preprocessing, Preprocessing::ZNormalized);
        assert!(preprocessing.is_z_normalized());

        clf.save(&path).unwrap();
        let (_, preprocessing) = DtwKnnClassifier::<String>::load_with_preprocessing(&path).unwrap();
        assert_eq!(preprocessing, Preprocessing::Raw);
        assert_eq!(Preprocessing::from_z_normalized(true), Preprocessing::ZNormalized);
    }

    #[test]
    fn inconsistent_reference_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let clf = fitted();
        let references = clf.references().unwrap();

        let envelope = ModelEnvelopeRef {
            format_version: FORMAT_VERSION,
            k: 1,
            window: Some(2),
            preprocessing: Preprocessing::Raw,
            n_references: references.len() + 1,
            references: references
                .examples()
                .iter()
                .map(|e| StoredExampleRef {
                    values: e.series.as_ref(),
                    label: &e.label,
                })
                .collect(),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = DtwKnnClassifier::<String>::load(&path).unwrap_err();
        assert!(matches!(
            err,
            KnnError::ReferenceCountMismatch { expected: 4, found: 3, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn missing_and_corrupt_files_fail() {
        let dir = TempDir::new().unwrap();
        let missing = DtwKnnClassifier::<String>::load(dir.path().join("nope.bin"));
        assert!(matches!(missing, Err(KnnError::ReadModel { .. })));

        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, [1u8, 0, 0, 0, 0xff]).unwrap();
        let corrupt = DtwKnnClassifier::<String>::load(&path);
        assert!(matches!(corrupt, Err(KnnError::DeserializeModel { .. })));
    }
}
