//! Metrics kept by the evaluation worker

use ragline_domain::{EvaluationResult, Metric};
use std::collections::BTreeMap;

/// Running totals over scored answers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationMetrics {
    /// Answers scored successfully
    pub scored: u64,

    /// Scoring attempts that failed
    pub failed: u64,

    /// Jobs dropped because the queue was full or closed
    pub dropped: u64,

    /// Summed scores per metric
    pub score_sums: BTreeMap<Metric, f64>,

    /// Summed scoring wall time (milliseconds)
    pub total_evaluation_ms: u64,
}

impl EvaluationMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful result
    pub fn record_result(&mut self, result: &EvaluationResult) {
        self.scored += 1;
        self.total_evaluation_ms += result.evaluation_time_ms;
        for metric in Metric::ALL {
            *self.score_sums.entry(metric).or_insert(0.0) += result.score(metric);
        }
    }

    /// Record a failed scoring attempt
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Mean score of one metric over scored answers
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        if self.scored == 0 {
            return None;
        }
        self.score_sums.get(&metric).map(|sum| sum / self.scored as f64)
    }

    /// Mean scoring time (milliseconds)
    pub fn mean_evaluation_ms(&self) -> Option<f64> {
        (self.scored > 0).then(|| self.total_evaluation_ms as f64 / self.scored as f64)
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Evaluation Metrics Summary".to_string(),
            "==========================".to_string(),
            format!("Scored: {}", self.scored),
            format!("Failed: {}", self.failed),
            format!("Dropped: {}", self.dropped),
        ];
        if self.scored > 0 {
            lines.push(String::new());
            for metric in Metric::ALL {
                lines.push(format!("  {}: {:.3}", metric, self.mean(metric).unwrap_or(0.0)));
            }
            lines.push(format!(
                "  mean time: {:.0}ms",
                self.mean_evaluation_ms().unwrap_or(0.0)
            ));
        }
        lines.join("\n")
    }
}
