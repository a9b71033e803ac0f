//! Orchestrator and pipeline-wide configuration
//!
//! [`RaglineConfig`] gathers every component's section into one TOML
//! document:
//!
//! ```toml
//! [retrieval]
//! default_k = 4
//!
//! [assembly]
//! token_budget = 3000
//!
//! [generation]
//! timeout_ms = 30000
//!
//! [evaluation]
//! enabled = true
//!
//! [orchestrator]
//! request_timeout_ms = 60000
//!
//! [trace]
//! log_records = true
//! ```

use ragline_assembler::AssemblerConfig;
use ragline_domain::RetryPolicy;
use ragline_eval::EvaluatorConfig;
use ragline_generator::GeneratorConfig;
use ragline_retriever::RetrieverConfig;
use ragline_trace::TraceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A section failed validation
    #[error("Invalid [{section}] configuration: {message}")]
    Invalid {
        /// Offending section
        section: &'static str,
        /// What is wrong
        message: String,
    },
}

/// Configuration for the Query Orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Deadline for a whole request, across all stages (milliseconds)
    /// Default: 60000
    pub request_timeout_ms: u64,

    /// Limit for one retrieval attempt (milliseconds)
    /// Default: 5000
    pub retrieval_timeout_ms: u64,

    /// Retry policy for transient retrieval failures
    pub retrieval_retry: RetryPolicy,

    /// Longest accepted question, in characters
    /// Default: 1000
    pub max_question_chars: usize,

    /// Events buffered between a streamed query and a slow consumer
    pub stream_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
            retrieval_timeout_ms: 5_000,
            retrieval_retry: RetryPolicy::default(),
            max_question_chars: 1000,
            stream_buffer: 32,
        }
    }
}

impl OrchestratorConfig {
    /// Tight deadlines, single attempt
    pub fn aggressive() -> Self {
        Self {
            request_timeout_ms: 20_000,
            retrieval_timeout_ms: 2_000,
            retrieval_retry: RetryPolicy::none(),
            ..Self::default()
        }
    }

    /// Generous deadlines and more retries
    pub fn lenient() -> Self {
        Self {
            request_timeout_ms: 180_000,
            retrieval_timeout_ms: 15_000,
            retrieval_retry: RetryPolicy {
                max_attempts: 5,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }

    /// Request deadline as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retrieval attempt limit as Duration
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms must be greater than 0".to_string());
        }
        if self.retrieval_timeout_ms == 0 {
            return Err("retrieval_timeout_ms must be greater than 0".to_string());
        }
        if self.max_question_chars == 0 {
            return Err("max_question_chars must be greater than 0".to_string());
        }
        if self.stream_buffer == 0 {
            return Err("stream_buffer must be greater than 0".to_string());
        }
        self.retrieval_retry
            .validate()
            .map_err(|e| format!("retrieval_retry: {}", e))
    }
}

/// Every pipeline section in one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaglineConfig {
    /// `[retrieval]`
    pub retrieval: RetrieverConfig,
    /// `[assembly]`
    pub assembly: AssemblerConfig,
    /// `[generation]`
    pub generation: GeneratorConfig,
    /// `[evaluation]`
    pub evaluation: EvaluatorConfig,
    /// `[orchestrator]`
    pub orchestrator: OrchestratorConfig,
    /// `[trace]`
    pub trace: TraceConfig,
}

impl RaglineConfig {
    /// Parse and validate a TOML document; missing sections use defaults
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RaglineConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Serialize to a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |section: &'static str| move |message: String| ConfigError::Invalid { section, message };
        self.retrieval.validate().map_err(invalid("retrieval"))?;
        self.assembly.validate().map_err(invalid("assembly"))?;
        self.generation.validate().map_err(invalid("generation"))?;
        self.evaluation.validate().map_err(invalid("evaluation"))?;
        self.orchestrator.validate().map_err(invalid("orchestrator"))?;
        self.trace.validate().map_err(invalid("trace"))?;
        Ok(())
    }
}
