//! Hyper-parameter search over `k` and the warping window.
//!
//! Each candidate is fit on a training set and scored on a validation set.
//! Distances depend only on the window, so one validation-by-training
//! distance table is computed per window and shared by every `k`.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};
use warpknn_dtw::{BandConstraint, Dtw, DtwDistance, DtwError};

use crate::config::KnnConfig;
use crate::error::KnnError;
use crate::example::{Label, LabeledExample, ReferenceSet};
use crate::neighbors::{Neighbor, nearest_indices};
use crate::vote::majority_vote;

/// Grid of `k` values and warping windows to evaluate.
///
/// Candidates are visited in `ks x windows` order (`k` outer). Accuracy ties
/// go to the earliest candidate in that order.
#[derive(Debug, Clone)]
pub struct GridSearch {
    ks: Vec<usize>,
    windows: Vec<Option<usize>>,
}

/// One `(k, window)` combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Number of neighbors.
    pub k: usize,
    /// Sakoe-Chiba radius, `None` for unconstrained.
    pub window: Option<usize>,
}

/// What happened when a candidate was evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// The candidate was fit and scored.
    Scored {
        /// Validation accuracy.
        accuracy: f64,
    },
    /// The candidate could not be fit or could not align every pair.
    Skipped {
        /// Human-readable cause.
        reason: String,
    },
}

/// A candidate together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    /// The evaluated combination.
    pub candidate: Candidate,
    /// Its outcome.
    pub outcome: CandidateOutcome,
}

impl CandidateScore {
    /// Return the validation accuracy, or `None` if skipped.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        match self.outcome {
            CandidateOutcome::Scored { accuracy } => Some(accuracy),
            CandidateOutcome::Skipped { .. } => None,
        }
    }
}

/// Outcome of every candidate in grid order.
#[derive(Debug, Clone, Serialize)]
pub struct GridSearchResult {
    /// One entry per candidate, `k` outer and window inner.
    pub candidates: Vec<CandidateScore>,
}

impl GridSearchResult {
    /// Return the highest-accuracy candidate, earliest on ties.
    ///
    /// Returns `None` when every candidate was skipped.
    #[must_use]
    pub fn best(&self) -> Option<&CandidateScore> {
        let mut best: Option<(&CandidateScore, f64)> = None;
        for score in &self.candidates {
            if let Some(acc) = score.accuracy()
                && best.is_none_or(|(_, top)| acc > top)
            {
                best = Some((score, acc));
            }
        }
        best.map(|(score, _)| score)
    }

    /// Return a configuration for the best candidate.
    #[must_use]
    pub fn best_config(&self) -> Option<KnnConfig> {
        let best = self.best()?;
        KnnConfig::new(best.candidate.k)
            .ok()
            .map(|config| config.with_window(best.candidate.window))
    }
}

impl GridSearch {
    /// Create a grid over `ks` and `windows`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::EmptyGrid`] | `ks` or `windows` is empty |
    /// | [`KnnError::InvalidK`] | any `k` is zero |
    pub fn new(ks: Vec<usize>, windows: Vec<Option<usize>>) -> Result<Self, KnnError> {
        if ks.is_empty() || windows.is_empty() {
            return Err(KnnError::EmptyGrid);
        }
        if ks.contains(&0) {
            return Err(KnnError::InvalidK { k: 0 });
        }
        Ok(Self { ks, windows })
    }

    /// Return every candidate in evaluation order.
    #[must_use]
    pub fn candidates(&self) -> Vec<Candidate> {
        self.ks
            .iter()
            .flat_map(|&k| self.windows.iter().map(move |&window| Candidate { k, window }))
            .collect()
    }

    /// Fit every candidate on `train` and score it on `validation`.
    ///
    /// Candidates with `k` larger than `train`, or whose window cannot align
    /// some validation series with some training series, are reported as
    /// skipped rather than failing the search.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`KnnError::EmptyReferenceSet`] | `train` is empty |
    /// | [`KnnError::EmptyQueries`] | `validation` is empty |
    /// | [`KnnError::NonFiniteDistance`] | a distance under an admissible window overflows |
    #[instrument(skip_all, fields(
        n_train = train.len(),
        n_validation = validation.len(),
        n_candidates = self.ks.len() * self.windows.len(),
    ))]
    pub fn evaluate<L: Label>(
        &self,
        train: &[LabeledExample<L>],
        validation: &[LabeledExample<L>],
    ) -> Result<GridSearchResult, KnnError> {
        if train.is_empty() {
            return Err(KnnError::EmptyReferenceSet);
        }
        if validation.is_empty() {
            return Err(KnnError::EmptyQueries);
        }

        let references = ReferenceSet::new(train.to_vec());
        let tables = self
            .windows
            .iter()
            .map(|&window| distance_table(window, train, validation))
            .collect::<Result<Vec<_>, _>>()?;

        let grid: Vec<(Candidate, usize)> = self
            .ks
            .iter()
            .flat_map(|&k| {
                self.windows
                    .iter()
                    .enumerate()
                    .map(move |(w, &window)| (Candidate { k, window }, w))
            })
            .collect();

        let candidates: Vec<CandidateScore> = grid
            .into_par_iter()
            .map(|(candidate, w)| {
                let outcome = if candidate.k > train.len() {
                    CandidateOutcome::Skipped {
                        reason: KnnError::KExceedsExamples {
                            k: candidate.k,
                            n_examples: train.len(),
                        }
                        .to_string(),
                    }
                } else {
                    match &tables[w] {
                        Ok(rows) => CandidateOutcome::Scored {
                            accuracy: score_table(rows, candidate.k, &references, validation),
                        },
                        Err(err) => CandidateOutcome::Skipped {
                            reason: KnnError::WindowConstraint(err.clone()).to_string(),
                        },
                    }
                };
                CandidateScore { candidate, outcome }
            })
            .collect();

        for score in &candidates {
            match &score.outcome {
                CandidateOutcome::Scored { accuracy } => info!(
                    k = score.candidate.k,
                    window = ?score.candidate.window,
                    accuracy,
                    "candidate scored"
                ),
                CandidateOutcome::Skipped { reason } => warn!(
                    k = score.candidate.k,
                    window = ?score.candidate.window,
                    reason = %reason,
                    "candidate skipped"
                ),
            }
        }

        Ok(GridSearchResult { candidates })
    }
}

type DistanceTable = Result<Vec<Vec<DtwDistance>>, DtwError>;

/// Validation-by-training distances for one window.
///
/// The inner `Result` holds a window violation, which skips the window's
/// candidates. It is checked for every pair before any distance is computed,
/// so an overflow elsewhere cannot mask it. Any other DTW failure aborts the
/// search.
fn distance_table<L: Label>(
    window: Option<usize>,
    train: &[LabeledExample<L>],
    validation: &[LabeledExample<L>],
) -> Result<DistanceTable, KnnError> {
    let constraint = BandConstraint::from_window(window);
    for query in validation {
        for reference in train {
            if let Err(err) = constraint.admits(query.series.len(), reference.series.len()) {
                return Ok(Err(err));
            }
        }
    }

    let dtw = Dtw::from_constraint(constraint);
    let rows = validation
        .par_iter()
        .map(|query| {
            train
                .iter()
                .map(|reference| dtw.distance(query.series.as_view(), reference.series.as_view()))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ok(rows))
}

fn score_table<L: Label>(
    rows: &[Vec<DtwDistance>],
    k: usize,
    references: &ReferenceSet<L>,
    validation: &[LabeledExample<L>],
) -> f64 {
    let correct = rows
        .iter()
        .zip(validation)
        .filter(|(row, truth)| {
            let neighbors: Vec<Neighbor<'_, L>> = nearest_indices(row, k)
                .into_iter()
                .map(|index| Neighbor {
                    index,
                    distance: row[index],
                    label: &references.examples()[index].label,
                })
                .collect();
            majority_vote(&neighbors, references) == Some(&truth.label)
        })
        .count();
    correct as f64 / validation.len() as f64
}

/// Shuffle `examples` with a seeded RNG and split off a hold-out set.
///
/// The hold-out receives `round(n * fraction)` examples, clamped so both
/// sides are non-empty. Each side keeps the original relative order.
/// Returns `(train, holdout)`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`KnnError::InvalidHoldoutFraction`] | `fraction` not in (0.0, 1.0) |
/// | [`KnnError::TooFewExamplesForHoldout`] | fewer than 2 examples |
pub fn holdout_split<L>(
    examples: Vec<LabeledExample<L>>,
    fraction: f64,
    seed: u64,
) -> Result<(Vec<LabeledExample<L>>, Vec<LabeledExample<L>>), KnnError> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(KnnError::InvalidHoldoutFraction { fraction });
    }
    let n = examples.len();
    if n < 2 {
        return Err(KnnError::TooFewExamplesForHoldout { n_examples: n });
    }

    let n_holdout = ((n as f64 * fraction).round() as usize).clamp(1, n - 1);
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let mut held = vec![false; n];
    for &i in &order[..n_holdout] {
        held[i] = true;
    }

    let (holdout, train): (Vec<_>, Vec<_>) =
        examples.into_iter().zip(held).partition(|(_, h)| *h);
    Ok((
        train.into_iter().map(|(e, _)| e).collect(),
        holdout.into_iter().map(|(e, _)| e).collect(),
    ))
}
