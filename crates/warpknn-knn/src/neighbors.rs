//! Nearest-neighbor selection.
//!
//! Neighbors are ordered by ascending distance, ties broken by the reference's
//! insertion index. The exhaustive selector and the streaming buffer apply the
//! same order, so pruned and unpruned searches pick identical neighbors.

use std::cmp::Ordering;

use warpknn_dtw::DtwDistance;

/// One of the k nearest references to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a, L> {
    /// Position of the reference in the fitted set.
    pub index: usize,
    /// DTW distance from the query.
    pub distance: DtwDistance,
    /// The reference's label.
    pub label: &'a L,
}

fn rank(a: (DtwDistance, usize), b: (DtwDistance, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Return the indices of the `k` smallest distances, nearest first.
///
/// `distances[i]` is the distance to reference `i`.
pub(crate) fn nearest_indices(distances: &[DtwDistance], k: usize) -> Vec<usize> {
    let cmp = |&a: &usize, &b: &usize| rank((distances[a], a), (distances[b], b));
    let mut order: Vec<usize> = (0..distances.len()).collect();
    if k == 0 {
        return Vec::new();
    }
    if k < order.len() {
        order.select_nth_unstable_by(k - 1, cmp);
        order.truncate(k);
    }
    order.sort_unstable_by(cmp);
    order
}

/// Bounded best-k buffer for a sequential scan over references.
///
/// References must be offered in ascending index order. Once full,
/// [`cutoff`](Self::cutoff) is the current k-th best distance; a later
/// reference at exactly that distance loses the tie, so anything the
/// early-abandoning DTW prunes could never have been admitted.
#[derive(Debug)]
pub(crate) struct NeighborBuffer {
    k: usize,
    entries: Vec<(DtwDistance, usize)>,
}

impl NeighborBuffer {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k + 1),
        }
    }

    /// Distance a new candidate must not exceed to be worth computing in full.
    pub(crate) fn cutoff(&self) -> f64 {
        if self.entries.len() < self.k {
            f64::INFINITY
        } else {
            self.entries
                .last()
                .map_or(f64::INFINITY, |(d, _)| d.value())
        }
    }

    /// Offer reference `index` at `distance`. Abandoned distances are ignored.
    pub(crate) fn offer(&mut self, index: usize, distance: DtwDistance) {
        if distance.is_abandoned() || self.k == 0 {
            return;
        }
        if self.entries.len() == self.k {
            match self.entries.last() {
                Some(&(worst, _)) if distance.total_cmp(&worst) == Ordering::Less => {}
                _ => return,
            }
        }
        let at = self
            .entries
            .partition_point(|&entry| rank(entry, (distance, index)) == Ordering::Less);
        self.entries.insert(at, (distance, index));
        self.entries.truncate(self.k);
    }

    /// Consume the buffer, returning `(index, distance)` pairs nearest first.
    pub(crate) fn into_sorted(self) -> Vec<(usize, DtwDistance)> {
        self.entries.into_iter().map(|(d, i)| (i, d)).collect()
    }
}
