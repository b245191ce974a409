//! Labeled examples and the reference set a fitted classifier owns.

use warpknn_dtw::TimeSeries;

/// Bound on class label types: cloneable, comparable, and shareable across threads.
pub trait Label: Clone + PartialEq + Send + Sync {}

impl<T: Clone + PartialEq + Send + Sync> Label for T {}

/// A time series paired with its class label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample<L> {
    /// The series.
    pub series: TimeSeries,
    /// Its class label.
    pub label: L,
}

impl<L> LabeledExample<L> {
    /// Pair a series with a label.
    pub fn new(series: TimeSeries, label: L) -> Self {
        Self { series, label }
    }
}

/// Pair parallel series and label vectors into examples.
///
/// Extra items on the longer side are dropped; callers compare lengths first
/// when that matters.
pub fn zip_examples<L>(series: Vec<TimeSeries>, labels: Vec<L>) -> Vec<LabeledExample<L>> {
    series.into_iter().zip(labels).map(|(s, l)| LabeledExample::new(s, l)).collect()
}

/// Ordered, read-only collection of labeled examples.
///
/// Alongside the examples it records, for each example, the index of the first
/// example carrying the same label. Vote tie-breaks use that to prefer labels
/// seen earlier in insertion order.
#[derive(Debug, Clone)]
pub struct ReferenceSet<L> {
    examples: Vec<LabeledExample<L>>,
    first_seen: Vec<usize>,
}

impl<L: Label> ReferenceSet<L> {
    pub(crate) fn new(examples: Vec<LabeledExample<L>>) -> Self {
        let mut representatives: Vec<usize> = Vec::new();
        let first_seen = examples
            .iter()
            .enumerate()
            .map(|(i, example)| {
                match representatives
                    .iter()
                    .find(|&&r| examples[r].label == example.label)
                {
                    Some(&r) => r,
                    None => {
                        representatives.push(i);
                        i
                    }
                }
            })
            .collect();
        Self { examples, first_seen }
    }

    /// Return the number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Return true if the set holds no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Return the examples in insertion order.
    #[must_use]
    pub fn examples(&self) -> &[LabeledExample<L>] {
        &self.examples
    }

    /// Return the index of the first example sharing example `index`'s label.
    #[must_use]
    pub fn first_seen(&self, index: usize) -> usize {
        self.first_seen[index]
    }

    /// Return the distinct labels in order of first appearance.
    #[must_use]
    pub fn classes(&self) -> Vec<&L> {
        self.first_seen
            .iter()
            .enumerate()
            .filter(|&(i, &first)| i == first)
            .map(|(i, _)| &self.examples[i].label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(value: f64, label: &str) -> LabeledExample<String> {
        LabeledExample::new(TimeSeries::new(vec![value]).unwrap(), label.to_string())
    }

    #[test]
    fn first_seen_points_at_earliest_label() {
        let set = ReferenceSet::new(vec![
            example(0.0, "b"),
            example(1.0, "a"),
            example(2.0, "b"),
            example(3.0, "a"),
            example(4.0, "c"),
        ]);
        let first: Vec<usize> = (0..set.len()).map(|i| set.first_seen(i)).collect();
        assert_eq!(first, vec![0, 1, 0, 1, 4]);
        assert_eq!(set.classes(), vec!["b", "a", "c"]);
    }

    #[test]
    fn zip_pairs_in_order() {
        let series = vec![TimeSeries::new(vec![1.0]).unwrap(), TimeSeries::new(vec![2.0]).unwrap()];
        let examples = zip_examples(series, vec![7, 9]);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[1].label, 9);
        assert_eq!(examples[1].series.as_ref(), &[2.0]);
    }
}
