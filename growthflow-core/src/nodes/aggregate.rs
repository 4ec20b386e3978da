//! Online aggregation and decay helpers shared by node kinds.

use indexmap::IndexMap;

use crate::graph::{FlowPassId, NodeId};

/// Running mean over the latest value reported by each predecessor.
///
/// A predecessor that reports twice replaces its earlier contribution, so the
/// mean always covers exactly one value per predecessor seen so far.
#[derive(Debug, Clone, Default)]
pub struct IncrementalMean {
    contributions: IndexMap<NodeId, f64>,
    sum: f64,
}

impl IncrementalMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as the latest report from `from` and return the new mean.
    pub fn record(&mut self, from: NodeId, value: f64) -> f64 {
        let previous = self.contributions.insert(from, value).unwrap_or(0.0);
        self.sum -= previous;
        self.sum += value;
        self.mean()
    }

    /// Current mean, or zero with no contributions.
    pub fn mean(&self) -> f64 {
        if self.contributions.is_empty() {
            0.0
        } else {
            self.sum / self.contributions.len() as f64
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Latest value reported by `from`, if it has reported.
    pub fn contribution(&self, from: NodeId) -> Option<f64> {
        self.contributions.get(&from).copied()
    }

    pub fn clear(&mut self) {
        self.contributions.clear();
        self.sum = 0.0;
    }
}

/// Tolerance counter that triggers once it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    remaining: i64,
    default: i64,
}

impl Budget {
    pub fn new(default: i64) -> Self {
        Self {
            remaining: default,
            default,
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn default_value(&self) -> i64 {
        self.default
    }

    /// Spend `units` of tolerance. May go negative.
    pub fn consume(&mut self, units: i64) {
        self.remaining -= units;
    }

    pub fn reset(&mut self) {
        self.remaining = self.default;
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }
}

/// Number of passes strictly between `last` and `current` in which nothing
/// reached the node.
pub fn idle_gap(current: FlowPassId, last: FlowPassId) -> u64 {
    current.raw().saturating_sub(last.raw().saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn repeated_reports_replace_contribution() {
        let mut mean = IncrementalMean::new();
        let a = NodeId::from(1);
        let b = NodeId::from(2);

        assert_eq!(mean.record(a, 0.9), 0.9);
        assert!((mean.record(b, 0.1) - 0.5).abs() < 1e-12);
        // a reports again: its old value is swapped out, not averaged in.
        assert!((mean.record(a, 0.3) - 0.2).abs() < 1e-12);
        assert_eq!(mean.len(), 2);
        assert_eq!(mean.contribution(a), Some(0.3));

        mean.clear();
        assert!(mean.is_empty());
        assert_eq!(mean.mean(), 0.0);
        assert_eq!(mean.sum(), 0.0);
    }

    #[test]
    fn budget_counts_down_and_resets() {
        let mut budget = Budget::new(2);
        budget.consume(1);
        assert!(!budget.is_exhausted());
        budget.consume(3);
        assert_eq!(budget.remaining(), -2);
        assert!(budget.is_exhausted());
        budget.reset();
        assert_eq!(budget.remaining(), 2);

        assert!(Budget::new(0).is_exhausted());
    }

    #[test]
    fn idle_gap_counts_skipped_passes() {
        let pass = |n: u64| FlowPassId::from(n);
        assert_eq!(idle_gap(pass(5), pass(5)), 0);
        assert_eq!(idle_gap(pass(6), pass(5)), 0);
        assert_eq!(idle_gap(pass(9), pass(5)), 3);
        assert_eq!(idle_gap(pass(2), pass(5)), 0);
    }

    proptest! {
        #[test]
        fn mean_tracks_latest_reports(
            reports in prop::collection::vec((0u64..6, -10.0f64..10.0), 1..50)
        ) {
            let mut mean = IncrementalMean::new();
            let mut latest = std::collections::HashMap::new();

            for (from, value) in reports {
                mean.record(NodeId::from(from), value);
                latest.insert(from, value);
            }

            let expected = latest.values().sum::<f64>() / latest.len() as f64;
            prop_assert_eq!(mean.len(), latest.len());
            prop_assert!((mean.mean() - expected).abs() < 1e-9);
        }
    }
}
