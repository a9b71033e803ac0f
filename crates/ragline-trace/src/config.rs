//! Configuration for trace collection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the trace emitter
///
/// # Examples
///
/// ```
/// use ragline_trace::TraceConfig;
///
/// let config = TraceConfig::from_toml("buffer_capacity = 16\njsonl_path = \"traces.jsonl\"").unwrap();
/// assert_eq!(config.buffer_capacity, 16);
/// assert!(config.enabled);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Emit trace records at all
    pub enabled: bool,

    /// Records buffered between the request path and the worker
    /// Default: 1024
    pub buffer_capacity: usize,

    /// Forward every record to `tracing` at info level
    pub log_records: bool,

    /// Append records as JSON lines to this file
    pub jsonl_path: Option<PathBuf>,

    /// How often the worker flushes exporters (in milliseconds)
    /// Default: 1000
    pub flush_interval_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_capacity: 1024,
            log_records: true,
            jsonl_path: None,
            flush_interval_ms: 1000,
        }
    }
}

impl TraceConfig {
    /// Tracing switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Flush interval as Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_capacity == 0 {
            return Err("buffer_capacity must be greater than 0".to_string());
        }
        if self.flush_interval_ms == 0 {
            return Err("flush_interval_ms must be greater than 0".to_string());
        }
        Ok(())
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
    fn test_default_is_valid() {
        let config = TraceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = TraceConfig {
            buffer_capacity: 0,
            ..TraceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_roundtrips() {
        let text = TraceConfig::disabled().to_toml().unwrap();
        let parsed = TraceConfig::from_toml(&text).unwrap();
        assert!(!parsed.enabled);
    }
}
