//! Configuration for answer evaluation

use ragline_domain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the evaluation harness and its worker
///
/// # Examples
///
/// ```
/// use ragline_eval::EvaluatorConfig;
///
/// let config = EvaluatorConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.judge_timeout_ms, 30_000);
///
/// let config = EvaluatorConfig::from_toml("judge_model = \"llama3.1:70b\"").unwrap();
/// assert_eq!(config.judge_model.as_deref(), Some("llama3.1:70b"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Evaluation is available at all; requests still opt in individually
    pub enabled: bool,

    /// Maximum time for one judge call (milliseconds)
    pub judge_timeout_ms: u64,

    /// Log every result at info level
    pub log_results: bool,

    /// Judge model; falls back to the generation model when unset
    pub judge_model: Option<String>,

    /// Retry policy for transient judge failures
    pub retry: RetryPolicy,

    /// Jobs buffered before new ones are dropped
    pub queue_capacity: usize,

    /// Append results as JSON lines to this file
    pub output_path: Option<PathBuf>,

    /// Jobs scored concurrently by `score_batch`
    pub batch_concurrency: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            judge_timeout_ms: 30_000,
            log_results: true,
            judge_model: None,
            retry: RetryPolicy::default(),
            queue_capacity: 64,
            output_path: None,
            batch_concurrency: 4,
        }
    }
}

impl EvaluatorConfig {
    /// Evaluation switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Judge timeout as Duration
    pub fn judge_timeout(&self) -> Duration {
        Duration::from_millis(self.judge_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.judge_timeout_ms == 0 {
            return Err("judge_timeout_ms must be greater than 0".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".to_string());
        }
        if self.batch_concurrency == 0 {
            return Err("batch_concurrency must be greater than 0".to_string());
        }
        if matches!(&self.judge_model, Some(m) if m.trim().is_empty()) {
            return Err("judge_model cannot be empty when set".to_string());
        }
        self.retry.validate().map_err(|e| format!("retry: {}", e))
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
