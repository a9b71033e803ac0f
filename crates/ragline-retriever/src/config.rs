//! Configuration for the Retriever

use serde::{Deserialize, Serialize};

/// Configuration for the Retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Number of chunks returned when the caller does not ask for a count
    pub default_k: usize,

    /// Upper bound on any requested count
    pub max_k: usize,

    /// Hits scoring below this are discarded
    pub min_score: Option<f32>,
}

impl RetrieverConfig {
    /// Resolve a caller-requested count against the defaults and the cap
    ///
    /// `None` means "use the default". `Some(0)` is passed through so the
    /// retriever can reject it.
    pub fn effective_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_k).min(self.max_k)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_k == 0 {
            return Err("default_k must be greater than 0".to_string());
        }
        if self.max_k < self.default_k {
            return Err("max_k cannot be smaller than default_k".to_string());
        }
        if let Some(min) = self.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err("min_score must be within [-1.0, 1.0]".to_string());
            }
        }
        Ok(())
    }
}

impl Default for RetrieverConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            default_k: 4,
            max_k: 50,
            min_score: None,
        }
    }
}

impl RetrieverConfig {
    /// Aggressive preset: fewer, better chunks
    pub fn aggressive() -> Self {
        Self {
            default_k: 3,
            max_k: 10,
            min_score: Some(0.3),
        }
    }

    /// Lenient preset: wider recall
    pub fn lenient() -> Self {
        Self {
            default_k: 8,
            max_k: 100,
            min_score: None,
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
    fn test_presets_are_valid() {
        assert!(RetrieverConfig::default().validate().is_ok());
        assert!(RetrieverConfig::aggressive().validate().is_ok());
        assert!(RetrieverConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_effective_k() {
        let config = RetrieverConfig::default();
        assert_eq!(config.effective_k(None), 4);
        assert_eq!(config.effective_k(Some(7)), 7);
        assert_eq!(config.effective_k(Some(500)), 50);
        assert_eq!(config.effective_k(Some(0)), 0);
    }

    #[test]
    fn test_validation() {
        let mut config = RetrieverConfig::default();
        config.default_k = 0;
        assert!(config.validate().is_err());

        let mut config = RetrieverConfig::default();
        config.max_k = 2;
        assert!(config.validate().is_err());

        let mut config = RetrieverConfig::default();
        config.min_score = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RetrieverConfig::from_toml("default_k = 6").unwrap();
        assert_eq!(config.default_k, 6);
        assert_eq!(config.max_k, 50);
        assert!(config.to_toml().unwrap().contains("default_k = 6"));
    }
}
