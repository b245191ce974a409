//! UCR-archive style dataset reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use warpknn_dtw::TimeSeries;

use crate::IoError;
use crate::domain::{Dataset, DatasetName, Split};

/// Field separator of the dataset files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Tab-separated `.tsv` files (UCR 2018 layout).
    #[default]
    Tab,
    /// Comma-separated `.csv` files.
    Comma,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Self::Tab => b'\t',
            Self::Comma => b',',
        }
    }

    /// Return the file extension matching this delimiter.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Tab => "tsv",
            Self::Comma => "csv",
        }
    }
}

/// Reads labeled series laid out as `{root}/{name}/{name}_{SPLIT}.{ext}`.
///
/// Expected file format:
/// - No header row
/// - `label<sep>v0<sep>v1<sep>...`, one instance per row
/// - Rows may differ in length; trailing empty or `NaN` cells are padding and
///   are dropped
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | [`IoError::EmptyLabel`] | Label cell is blank |
/// | [`IoError::EmptySeries`] | Row has no values after trimming padding |
/// | [`IoError::NonFiniteValue`] | Cell before the padding is NaN, Inf, or unparseable |
#[derive(Debug, Clone)]
pub struct UcrReader {
    root: PathBuf,
    delimiter: Delimiter,
}

impl UcrReader {
    /// Create a reader for the archive rooted at `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            delimiter: Delimiter::Tab,
        }
    }

    /// Set the field separator (and with it the file extension).
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Return the file path for `name` and `split`.
    #[must_use]
    pub fn path_for(&self, name: &DatasetName, split: Split) -> PathBuf {
        self.root.join(name.as_str()).join(format!(
            "{}_{}.{}",
            name.as_str(),
            split.as_str(),
            self.delimiter.extension()
        ))
    }

    /// Read one split of a named dataset.
    ///
    /// # Errors
    ///
    /// See the type-level table.
    pub fn read(&self, name: &DatasetName, split: Split) -> Result<Dataset, IoError> {
        self.read_file(&self.path_for(name, split))
    }

    /// Read and validate a single data file, returning a [`Dataset`].
    ///
    /// # Errors
    ///
    /// See the type-level table.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_file(&self, path: &Path) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

        // flexible(true): ragged rows are legal, padding is handled per row.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter.byte())
            .from_reader(file);

        let mut labels = Vec::new();
        let mut series = Vec::new();
        let mut n_padded = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: path.to_path_buf(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let label = record.get(0).unwrap_or("");
            if label.is_empty() {
                return Err(IoError::EmptyLabel {
                    path: path.to_path_buf(),
                    row_index,
                });
            }

            let cells: Vec<&str> = record.iter().skip(1).collect();
            let n_values = cells
                .iter()
                .rposition(|cell| !is_padding(cell))
                .map_or(0, |last| last + 1);
            if n_values == 0 {
                return Err(IoError::EmptySeries {
                    path: path.to_path_buf(),
                    row_index,
                });
            }
            if n_values < cells.len() {
                n_padded += 1;
            }

            let values = cells[..n_values]
                .iter()
                .enumerate()
                .map(|(col_index, raw)| parse_finite(raw).ok_or_else(|| IoError::NonFiniteValue {
                    path: path.to_path_buf(),
                    row_index,
                    col_index,
                    raw: (*raw).to_string(),
                }))
                .collect::<Result<Vec<f64>, IoError>>()?;

            // Values are non-empty and finite here.
            let ts = TimeSeries::new(values).map_err(|_| IoError::EmptySeries {
                path: path.to_path_buf(),
                row_index,
            })?;

            labels.push(label.to_string());
            series.push(ts);
        }

        if series.is_empty() {
            return Err(IoError::EmptyDataset {
                path: path.to_path_buf(),
            });
        }
        if n_padded > 0 {
            debug!(n_padded, "trimmed trailing padding");
        }

        let dataset = Dataset { labels, series };
        let (min_len, max_len) = dataset.length_range().unwrap_or((0, 0));
        info!(
            n_instances = dataset.len(),
            n_classes = dataset.classes().len(),
            min_len,
            max_len,
            "dataset loaded"
        );
        Ok(dataset)
    }
}

fn is_padding(cell: &str) -> bool {
    cell.is_empty() || cell.parse::<f64>().is_ok_and(f64::is_nan)
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn read(content: &str) -> Result<Dataset, IoError> {
        let f = write_file(content);
        UcrReader::new(Path::new(".")).read_file(f.path())
    }

    #[test]
    fn reads_labels_and_values_in_order() {
        let ds = read("2\t0.0\t0.1\t0.2\n1\t5.0\t5.1\t5.2\n2\t-1.5\t0.0\t1e3\n").unwrap();
        assert_eq!(ds.labels, vec!["2", "1", "2"]);
        assert_eq!(ds.series[2].as_ref(), &[-1.5, 0.0, 1000.0]);
    }

    #[test]
    fn trailing_nan_padding_is_trimmed() {
        let ds = read("a\t1.0\t2.0\t3.0\nb\t4.0\tNaN\tNaN\nc\t5.0\t6.0\t\n").unwrap();
        assert_eq!(ds.series[0].len(), 3);
        assert_eq!(ds.series[1].as_ref(), &[4.0]);
        assert_eq!(ds.series[2].as_ref(), &[5.0, 6.0]);
        assert_eq!(ds.length_range(), Some((1, 3)));
    }

    #[test]
    fn comma_delimiter() {
        let f = write_file("x,1,2\ny,3,4,5\n");
        let ds = UcrReader::new(Path::new("."))
            .with_delimiter(Delimiter::Comma)
            .read_file(f.path())
            .unwrap();
        assert_eq!(ds.labels, vec!["x", "y"]);
        assert_eq!(ds.series[1].as_ref(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn interior_nan_is_rejected() {
        let result = read("a\t1.0\tNaN\t3.0\n");
        assert!(matches!(
            result,
            Err(IoError::NonFiniteValue { row_index: 0, col_index: 1, .. })
        ));
    }

    #[test]
    fn infinity_and_garbage_are_rejected() {
        assert!(matches!(read("a\t1.0\tinf\n"), Err(IoError::NonFiniteValue { .. })));
        assert!(matches!(
            read("a\t1.0\n b\t1.0\tabc\n"),
            Err(IoError::NonFiniteValue { row_index: 1, col_index: 1, .. })
        ));
    }

    #[test]
    fn blank_label_is_rejected() {
        let result = read("a\t1.0\n\t2.0\n");
        assert!(matches!(result, Err(IoError::EmptyLabel { row_index: 1, .. })));
    }

    #[test]
    fn all_padding_row_is_rejected() {
        let result = read("a\tNaN\tNaN\n");
        assert!(matches!(result, Err(IoError::EmptySeries { row_index: 0, .. })));
        assert!(matches!(read("a\n"), Err(IoError::EmptySeries { .. })));
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(matches!(read(""), Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn missing_file_is_reported() {
        let reader = UcrReader::new(Path::new("/nonexistent"));
        let name = DatasetName::new("Nope".into()).unwrap();
        assert!(matches!(reader.read(&name, Split::Train), Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn archive_layout_paths() {
        let reader = UcrReader::new(Path::new("/data/UCR"));
        let name = DatasetName::new("GunPoint".into()).unwrap();
        assert_eq!(
            reader.path_for(&name, Split::Test),
            PathBuf::from("/data/UCR/GunPoint/GunPoint_TEST.tsv")
        );
        let csv = reader.with_delimiter(Delimiter::Comma);
        assert!(csv.path_for(&name, Split::Train).ends_with("GunPoint/GunPoint_TRAIN.csv"));
    }
}
