//! Configuration for the Context Assembler

use serde::{Deserialize, Serialize};

/// How token costs are estimated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Characters divided by `chars_per_token`, rounded up
    #[default]
    CharRatio,
    /// Whitespace-separated words
    Words,
}

/// Configuration for the Context Assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Maximum tokens the assembled context may consume
    pub token_budget: usize,

    /// Same-document text similarity at or above which a chunk is a duplicate
    pub dedup_threshold: f64,

    /// Token estimator
    pub tokenizer: TokenizerKind,

    /// Characters per token for [`TokenizerKind::CharRatio`]
    pub chars_per_token: usize,
}

impl AssemblerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err("dedup_threshold must be within [0.0, 1.0]".to_string());
        }
        if self.chars_per_token == 0 {
            return Err("chars_per_token must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for AssemblerConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            token_budget: 3000,
            dedup_threshold: 0.9,
            tokenizer: TokenizerKind::CharRatio,
            chars_per_token: 4,
        }
    }
}

impl AssemblerConfig {
    /// Aggressive preset: small context, eager deduplication
    pub fn aggressive() -> Self {
        Self {
            token_budget: 1500,
            dedup_threshold: 0.8,
            tokenizer: TokenizerKind::CharRatio,
            chars_per_token: 4,
        }
    }

    /// Lenient preset: large context, only near-exact duplicates removed
    pub fn lenient() -> Self {
        Self {
            token_budget: 6000,
            dedup_threshold: 0.97,
            tokenizer: TokenizerKind::CharRatio,
            chars_per_token: 4,
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
