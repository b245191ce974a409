//! Majority vote over the k nearest neighbors.

use std::cmp::Ordering;

use crate::example::{Label, ReferenceSet};
use crate::neighbors::Neighbor;

#[derive(Debug)]
struct Tally<'a, L> {
    label: &'a L,
    votes: usize,
    total_distance: f64,
    first_seen: usize,
}

impl<L> Tally<'_, L> {
    fn mean_distance(&self) -> f64 {
        self.total_distance / self.votes as f64
    }

    /// More votes wins, then the smaller mean distance, then the label that
    /// appears first in the reference set.
    fn beats(&self, other: &Self) -> bool {
        match self.votes.cmp(&other.votes) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match self.mean_distance().total_cmp(&other.mean_distance()) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => self.first_seen < other.first_seen,
            },
        }
    }
}

/// Pick the winning label among `neighbors`. Returns `None` only when empty.
pub(crate) fn majority_vote<'a, L: Label>(
    neighbors: &[Neighbor<'a, L>],
    references: &ReferenceSet<L>,
) -> Option<&'a L> {
    let mut tallies: Vec<Tally<'a, L>> = Vec::new();
    for neighbor in neighbors {
        match tallies.iter_mut().find(|t| t.label == neighbor.label) {
            Some(tally) => {
                tally.votes += 1;
                tally.total_distance += neighbor.distance.value();
            }
            None => tallies.push(Tally {
                label: neighbor.label,
                votes: 1,
                total_distance: neighbor.distance.value(),
                first_seen: references.first_seen(neighbor.index),
            }),
        }
    }

    let mut tallies = tallies.into_iter();
    let mut best = tallies.next()?;
    for tally in tallies {
        if tally.beats(&best) {
            best = tally;
        }
    }
    Some(best.label)
}
