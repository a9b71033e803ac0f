//! Error types for evaluation

use ragline_domain::Metric;
use thiserror::Error;

/// Errors that can occur while scoring answers
#[derive(Error, Debug)]
pub enum EvalError {
    /// A judge call exceeded its time limit
    #[error("Judge for {metric} timed out after {timeout_ms}ms")]
    JudgeTimeout {
        /// Metric being scored
        metric: Metric,
        /// The limit that was exceeded
        timeout_ms: u64,
    },

    /// The judge provider failed
    #[error("Judge for {metric} failed after {attempts} attempt(s): {message}")]
    Judge {
        /// Metric being scored
        metric: Metric,
        /// Attempts made
        attempts: u32,
        /// Last failure
        message: String,
    },

    /// The judge replied without a usable number
    #[error("Judge for {metric} returned no score: {reply:?}")]
    UnparseableScore {
        /// Metric being scored
        metric: Metric,
        /// Start of the reply
        reply: String,
    },

    /// Writing results failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A result could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
