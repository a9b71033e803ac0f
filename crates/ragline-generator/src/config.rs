//! Configuration for the Generation Coordinator

use ragline_domain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reply used when the context cannot support an answer
pub const DEFAULT_DECLINE_MESSAGE: &str =
    "I don't have enough information to answer that question.";

/// What to do when retrieval produced no usable evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyContextPolicy {
    /// Reply with the decline message without calling the provider
    #[default]
    Decline,
    /// Let the model answer from general knowledge, flagged as such
    GeneralKnowledge,
}

/// Configuration for the Generation Coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Maximum time for one provider attempt (milliseconds)
    pub timeout_ms: u64,

    /// Retry policy for transient provider failures
    pub retry: RetryPolicy,

    /// Behaviour when the assembled context is empty
    pub empty_context: EmptyContextPolicy,

    /// Reply used when the answer cannot be grounded
    pub decline_message: String,

    /// Prior conversation turns included in the prompt
    pub max_history_turns: usize,

    /// Answer length limit in characters; longer output finishes `truncated`
    pub max_answer_chars: Option<usize>,

    /// Fragments buffered between the producer and a slow consumer
    pub stream_buffer: usize,
}

impl GeneratorConfig {
    /// Get the per-attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".to_string());
        }
        if self.decline_message.trim().is_empty() {
            return Err("decline_message cannot be empty".to_string());
        }
        if self.stream_buffer == 0 {
            return Err("stream_buffer must be greater than 0".to_string());
        }
        if self.max_answer_chars == Some(0) {
            return Err("max_answer_chars must be greater than 0 when set".to_string());
        }
        self.retry.validate().map_err(|e| format!("retry: {}", e))
    }
}

impl Default for GeneratorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            empty_context: EmptyContextPolicy::Decline,
            decline_message: DEFAULT_DECLINE_MESSAGE.to_string(),
            max_history_turns: 5,
            max_answer_chars: None,
            stream_buffer: 32,
        }
    }
}

impl GeneratorConfig {
    /// Aggressive preset: fail fast, short history
    pub fn aggressive() -> Self {
        Self {
            timeout_ms: 10_000,
            retry: RetryPolicy {
                max_attempts: 2,
                initial_backoff_ms: 100,
                backoff_multiplier: 2.0,
                max_backoff_ms: 1_000,
            },
            max_history_turns: 2,
            max_answer_chars: Some(4_000),
            ..Self::default()
        }
    }

    /// Lenient preset: patient with slow local models
    pub fn lenient() -> Self {
        Self {
            timeout_ms: 120_000,
            retry: RetryPolicy {
                max_attempts: 5,
                initial_backoff_ms: 500,
                backoff_multiplier: 2.0,
                max_backoff_ms: 10_000,
            },
            max_history_turns: 10,
            ..Self::default()
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.decline_message, DEFAULT_DECLINE_MESSAGE);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(GeneratorConfig::aggressive().validate().is_ok());
        assert!(GeneratorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = GeneratorConfig::default();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.decline_message = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().unwrap_err().starts_with("retry:"));
    }

    #[test]
    fn test_toml_policy_names() {
        let config = GeneratorConfig::from_toml(
            "empty_context = \"general_knowledge\"\n[retry]\nmax_attempts = 5",
        )
        .unwrap();
        assert_eq!(config.empty_context, EmptyContextPolicy::GeneralKnowledge);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 200);
    }
}
