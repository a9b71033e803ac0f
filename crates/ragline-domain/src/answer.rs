//! Generated answers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The provider finished normally
    Complete,
    /// Output was cut at the configured length limit
    Truncated,
    /// Generation failed or was cancelled part-way
    Error,
}

impl FinishReason {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Truncated => "truncated",
            FinishReason::Error => "error",
        }
    }

    /// Whether this reason ends the query successfully
    pub fn is_success(&self) -> bool {
        !matches!(self, FinishReason::Error)
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished answer
///
/// Only the generation coordinator builds answers. Fields are read-only
/// outside this crate's constructors; once built the answer is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    text: String,
    citations: Vec<String>,
    finish_reason: FinishReason,
    latency_ms: u64,
}

impl Answer {
    /// Freeze a finished answer
    pub fn new(
        text: impl Into<String>,
        citations: Vec<String>,
        finish_reason: FinishReason,
        latency_ms: u64,
    ) -> Self {
        Self {
            text: text.into(),
            citations,
            finish_reason,
            latency_ms,
        }
    }

    /// Freeze whatever text was produced before a failure
    pub fn failed(partial_text: impl Into<String>, latency_ms: u64) -> Self {
        Self::new(partial_text, Vec::new(), FinishReason::Error, latency_ms)
    }

    /// Answer text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Validated citations (chunk ids, first-appearance order)
    pub fn citations(&self) -> &[String] {
        &self.citations
    }

    /// Why generation stopped
    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    /// Time spent in generation
    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }
}

/// One streamed piece of answer text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFragment {
    /// 0-based position; indices are contiguous within one answer
    pub index: usize,
    /// Text of this piece
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_strings() {
        assert_eq!(FinishReason::Complete.as_str(), "complete");
        assert_eq!(FinishReason::Truncated.as_str(), "truncated");
        assert_eq!(FinishReason::Error.to_string(), "error");
        assert!(FinishReason::Truncated.is_success());
        assert!(!FinishReason::Error.is_success());
    }

    #[test]
    fn test_failed_answer() {
        let answer = Answer::failed("partial", 12);
        assert_eq!(answer.text(), "partial");
        assert!(answer.citations().is_empty());
        assert_eq!(answer.finish_reason(), FinishReason::Error);
        assert_eq!(answer.latency_ms(), 12);
    }

    #[test]
    fn test_finish_reason_serde() {
        let json = serde_json::to_string(&FinishReason::Truncated).unwrap();
        assert_eq!(json, "\"truncated\"");
    }
}
