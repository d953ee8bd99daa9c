//! In-memory operation metrics.
//!
//! Metrics are kept in a bounded ring; once the capacity is reached the
//! oldest entry is evicted. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Default number of metrics retained.
pub const DEFAULT_METRICS_CAPACITY: usize = 1000;

/// Number of most recent metrics used for averages in [`MetricsSummary`].
pub const SUMMARY_WINDOW: usize = 100;

/// One observed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub operation: String,
    pub duration: Duration,
    pub success: bool,
}

/// Aggregated view over the retained metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Metrics currently retained
    pub total_operations: usize,
    /// Mean duration over the summary window, in milliseconds
    pub avg_duration_ms: f64,
    /// Percentage of successes over the summary window
    pub success_rate: f64,
    /// Retained metric count per operation name
    pub operation_counts: BTreeMap<String, usize>,
    /// Retained failure count per operation name
    pub failure_counts: BTreeMap<String, usize>,
}

/// Bounded ring of [`Metric`]s.
#[derive(Debug, Clone)]
pub struct Metrics {
    capacity: usize,
    entries: VecDeque<Metric>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_METRICS_CAPACITY)
    }
}

impl Metrics {
    /// Create a ring holding at most `capacity` metrics (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_METRICS_CAPACITY)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a metric, evicting the oldest one when full.
    pub fn record(&mut self, operation: impl Into<String>, duration: Duration, success: bool) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Metric {
            operation: operation.into(),
            duration,
            success,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained metrics, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.entries.iter()
    }

    /// Number of retained metrics recorded under `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.entries
            .iter()
            .filter(|m| m.operation == operation)
            .count()
    }

    pub fn summary(&self) -> MetricsSummary {
        if self.entries.is_empty() {
            return MetricsSummary::default();
        }

        let window = self.entries.len().min(SUMMARY_WINDOW);
        let recent = self.entries.iter().skip(self.entries.len() - window);

        let mut total = Duration::ZERO;
        let mut successes = 0usize;
        for metric in recent {
            total += metric.duration;
            if metric.success {
                successes += 1;
            }
        }

        let mut operation_counts = BTreeMap::new();
        let mut failure_counts = BTreeMap::new();
        for metric in &self.entries {
            *operation_counts.entry(metric.operation.clone()).or_insert(0) += 1;
            if !metric.success {
                *failure_counts.entry(metric.operation.clone()).or_insert(0) += 1;
            }
        }

        MetricsSummary {
            total_operations: self.entries.len(),
            avg_duration_ms: round2(total.as_secs_f64() * 1000.0 / window as f64),
            success_rate: round2(successes as f64 * 100.0 / window as f64),
            operation_counts,
            failure_counts,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut metrics = Metrics::with_capacity(3);
        for i in 0..5 {
            metrics.record(format!("op{}", i), Duration::from_millis(1), true);
        }

        assert_eq!(metrics.len(), 3);
        let names: Vec<_> = metrics.iter().map(|m| m.operation.as_str()).collect();
        assert_eq!(names, vec!["op2", "op3", "op4"]);
    }

    #[test]
    fn default_capacity_is_one_thousand() {
        let mut metrics = Metrics::default();
        for _ in 0..1001 {
            metrics.record("load", Duration::ZERO, true);
        }
        assert_eq!(metrics.len(), 1000);
    }

    #[test]
    fn summary_uses_recent_window() {
        let mut metrics = Metrics::default();
        for _ in 0..SUMMARY_WINDOW {
            metrics.record("save", Duration::from_millis(10), false);
        }
        for _ in 0..SUMMARY_WINDOW {
            metrics.record("load", Duration::from_millis(2), true);
        }

        let summary = metrics.summary();
        assert_eq!(summary.total_operations, 2 * SUMMARY_WINDOW);
        assert_eq!(summary.avg_duration_ms, 2.0);
        assert_eq!(summary.success_rate, 100.0);
        assert_eq!(summary.operation_counts["save"], SUMMARY_WINDOW);
        assert_eq!(summary.failure_counts["save"], SUMMARY_WINDOW);
        assert!(!summary.failure_counts.contains_key("load"));
    }

    #[test]
    fn empty_summary() {
        assert_eq!(Metrics::default().summary(), MetricsSummary::default());
    }
}
