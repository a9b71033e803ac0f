//! Offline answer-quality scores

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::QueryId;

/// A scored quality dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Is every claim in the answer backed by the context?
    Groundedness,
    /// Does the answer address the question?
    Relevance,
    /// Is the answer free of contradictions with the context?
    Faithfulness,
}

impl Metric {
    /// All metrics, in reporting order
    pub const ALL: [Metric; 3] = [Metric::Groundedness, Metric::Relevance, Metric::Faithfulness];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Groundedness => "groundedness",
            Metric::Relevance => "relevance",
            Metric::Faithfulness => "faithfulness",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores for one finished answer
///
/// Serialises flat so each result is a single JSON object keyed by
/// `query_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The scored query
    pub query_id: QueryId,
    /// Claim support by the context, in [0, 1]
    pub groundedness: f64,
    /// Answer relevance to the question, in [0, 1]
    pub relevance: f64,
    /// Absence of contradictions, in [0, 1]
    pub faithfulness: f64,
    /// When scoring finished (Unix milliseconds)
    pub computed_at: u64,
    /// Wall time spent scoring
    pub evaluation_time_ms: u64,
}

impl EvaluationResult {
    /// Build a result, clamping every score into [0, 1]
    ///
    /// NaN scores become 0.
    pub fn new(
        query_id: QueryId,
        groundedness: f64,
        relevance: f64,
        faithfulness: f64,
        computed_at: u64,
        evaluation_time_ms: u64,
    ) -> Self {
        Self {
            query_id,
            groundedness: clamp_score(groundedness),
            relevance: clamp_score(relevance),
            faithfulness: clamp_score(faithfulness),
            computed_at,
            evaluation_time_ms,
        }
    }

    /// Score for one metric
    pub fn score(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Groundedness => self.groundedness,
            Metric::Relevance => self.relevance,
            Metric::Faithfulness => self.faithfulness,
        }
    }

    /// Unweighted mean of the three scores
    pub fn mean(&self) -> f64 {
        (self.groundedness + self.relevance + self.faithfulness) / 3.0
    }
}

/// Clamp a raw score into [0, 1]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
