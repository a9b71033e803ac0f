//! Error types for the CLI application.

use ragline_orchestrator::{ConfigError, QueryFailure};
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline configuration error
    #[error(transparent)]
    Pipeline(#[from] ConfigError),

    /// The query failed
    #[error("Query failed: {0}")]
    Query(#[from] QueryFailure),

    /// Index store error
    #[error("Index error: {0}")]
    Store(#[from] ragline_store::StoreError),

    /// Provider setup error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Evaluation error
    #[error("Evaluation error: {0}")]
    Eval(#[from] ragline_eval::EvalError),

    /// Trace setup error
    #[error("Trace error: {0}")]
    Trace(#[from] ragline_trace::TraceError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The index cannot serve queries
    #[error("Index is not ready")]
    NotReady,
}

impl From<ragline_llm::LlmError> for CliError {
    fn from(error: ragline_llm::LlmError) -> Self {
        CliError::Provider(error.to_string())
    }
}

impl From<ragline_store::EmbeddingError> for CliError {
    fn from(error: ragline_store::EmbeddingError) -> Self {
        CliError::Provider(error.to_string())
    }
}
