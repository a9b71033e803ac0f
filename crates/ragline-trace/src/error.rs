//! Error types for trace export

use thiserror::Error;

/// Errors raised while exporting trace records
///
/// Never surfaced to query callers; the worker logs them and moves on.
#[derive(Error, Debug)]
pub enum TraceError {
    /// Writing the export target failed
    #[error("Trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded
    #[error("Trace serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
