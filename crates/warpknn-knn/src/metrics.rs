//! Accuracy and confusion matrix over arbitrary labels.

use std::fmt;

use serde::Serialize;

use crate::error::KnnError;

fn check_lengths<L>(predicted: &[L], truth: &[L]) -> Result<(), KnnError> {
    if predicted.len() != truth.len() {
        return Err(KnnError::LengthMismatch {
            n_queries: predicted.len(),
            n_labels: truth.len(),
        });
    }
    if truth.is_empty() {
        return Err(KnnError::EmptyQueries);
    }
    Ok(())
}

/// Fraction of positions where `predicted` equals `truth`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`KnnError::LengthMismatch`] | slices differ in length |
/// | [`KnnError::EmptyQueries`] | both slices are empty |
pub fn accuracy<L: PartialEq>(predicted: &[L], truth: &[L]) -> Result<f64, KnnError> {
    check_lengths(predicted, truth)?;
    let correct = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(correct as f64 / truth.len() as f64)
}

/// A confusion matrix for multi-class classification.
///
/// Classes are ordered by first appearance in the true labels, then in the
/// predictions. Entry `counts[t][p]` counts samples of true class `t`
/// predicted as class `p`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfusionMatrix<L> {
    classes: Vec<L>,
    counts: Vec<Vec<usize>>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics<L> {
    /// The class label.
    pub class: L,
    /// TP / (TP + FP). 0.0 if nothing was predicted as this class.
    pub precision: f64,
    /// TP / (TP + FN). 0.0 if no true samples have this class.
    pub recall: f64,
    /// Harmonic mean of precision and recall. 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl<L: Clone + PartialEq> ConfusionMatrix<L> {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::LengthMismatch`] | slices differ in length |
    /// | [`KnnError::EmptyQueries`] | zero labels provided |
    pub fn from_labels(truth: &[L], predicted: &[L]) -> Result<Self, KnnError> {
        check_lengths(predicted, truth)?;
        let mut classes: Vec<L> = Vec::new();
        for label in truth.iter().chain(predicted) {
            if !classes.contains(label) {
                classes.push(label.clone());
            }
        }
        let position = |label: &L| classes.iter().position(|c| c == label).unwrap_or(0);
        let mut counts = vec![vec![0usize; classes.len()]; classes.len()];
        for (t, p) in truth.iter().zip(predicted) {
            counts[position(t)][position(p)] += 1;
        }
        Ok(Self { classes, counts })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.classes.len()).map(|i| self.counts[i][i]).sum();
        let total: usize = self.counts.iter().flatten().sum();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Per-class precision, recall, F1, and support, in class order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics<L>> {
        let n = self.classes.len();
        (0..n)
            .map(|c| {
                let tp = self.counts[c][c];
                let predicted_as_c: usize = (0..n).map(|i| self.counts[i][c]).sum();
                let support: usize = self.counts[c].iter().sum();
                let precision = ratio(tp, predicted_as_c);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: self.classes[c].clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the class labels in matrix order.
    #[must_use]
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// Return the count rows, indexed `[true][predicted]`.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl<L: fmt::Display> fmt::Display for ConfusionMatrix<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.classes.iter().map(ToString::to_string).collect();
        let width = names.iter().map(String::len).max().unwrap_or(0).max(5);

        write!(f, "{:>width$}", "")?;
        for name in &names {
            write!(f, " {name:>width$}")?;
        }
        writeln!(f)?;

        for (name, row) in names.iter().zip(&self.counts) {
            write!(f, "{name:>width$}")?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
