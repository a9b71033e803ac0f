//! Metrics collected by the trace worker

use ragline_domain::{QueryState, TraceRecord};
use std::collections::BTreeMap;

/// Counters kept while draining trace records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceMetrics {
    /// Records received per stage
    pub records: BTreeMap<QueryState, u64>,

    /// Summed stage durations per stage (in milliseconds)
    pub stage_time_ms: BTreeMap<QueryState, u64>,

    /// Records that reached every exporter
    pub exported: u64,

    /// Exporter calls that failed
    pub export_failures: u64,

    /// Records dropped by the sink before reaching the worker
    pub dropped: u64,
}

impl TraceMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received record
    pub fn record(&mut self, record: &TraceRecord) {
        *self.records.entry(record.stage).or_insert(0) += 1;
        *self.stage_time_ms.entry(record.stage).or_insert(0) += record.duration_ms();
    }

    /// Total records received
    pub fn total_records(&self) -> u64 {
        self.records.values().sum()
    }

    /// Queries that reached `Completed`
    pub fn completed(&self) -> u64 {
        self.records.get(&QueryState::Completed).copied().unwrap_or(0)
    }

    /// Queries that reached `Failed`
    pub fn failed(&self) -> u64 {
        self.records.get(&QueryState::Failed).copied().unwrap_or(0)
    }

    /// Mean duration of a stage, if it was seen
    pub fn mean_stage_ms(&self, stage: QueryState) -> Option<f64> {
        let count = *self.records.get(&stage)?;
        let total = *self.stage_time_ms.get(&stage)?;
        (count > 0).then(|| total as f64 / count as f64)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Trace Metrics Summary".to_string(),
            "=====================".to_string(),
            format!("Records: {}", self.total_records()),
            format!("Exported: {}", self.exported),
            format!("Export failures: {}", self.export_failures),
            format!("Dropped: {}", self.dropped),
            format!("Completed: {}, failed: {}", self.completed(), self.failed()),
        ];

        if !self.records.is_empty() {
            lines.push(String::new());
            lines.push("Stages:".to_string());
            for (stage, count) in &self.records {
                let mean = self.mean_stage_ms(*stage).unwrap_or(0.0);
                lines.push(format!("  {}: {} (mean {:.1}ms)", stage, count, mean));
            }
        }

        lines.join("\n")
    }
}
