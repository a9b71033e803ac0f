//! Caller-visible error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error kinds surfaced to callers
///
/// The string forms are part of the external contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The index store could not be reached or errored
    RetrievalUnavailable,
    /// The embedding provider failed
    EmbeddingError,
    /// The generation provider did not finish in time
    GenerationTimeout,
    /// The generation provider failed or kept failing
    GenerationUnavailable,
    /// The overall request deadline expired
    OrchestratorTimeout,
    /// The caller cancelled the request
    Cancelled,
    /// The request was rejected before dispatch
    InvalidQuery,
}

impl ErrorKind {
    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RetrievalUnavailable => "retrieval_unavailable",
            ErrorKind::EmbeddingError => "embedding_error",
            ErrorKind::GenerationTimeout => "generation_timeout",
            ErrorKind::GenerationUnavailable => "generation_unavailable",
            ErrorKind::OrchestratorTimeout => "orchestrator_timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidQuery => "invalid_query",
        }
    }

    /// Parse a kind from its stable name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "retrieval_unavailable" => Some(ErrorKind::RetrievalUnavailable),
            "embedding_error" => Some(ErrorKind::EmbeddingError),
            "generation_timeout" => Some(ErrorKind::GenerationTimeout),
            "generation_unavailable" => Some(ErrorKind::GenerationUnavailable),
            "orchestrator_timeout" => Some(ErrorKind::OrchestratorTimeout),
            "cancelled" => Some(ErrorKind::Cancelled),
            "invalid_query" => Some(ErrorKind::InvalidQuery),
            _ => None,
        }
    }

    /// Whether failures of this kind are retried inside their stage
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::RetrievalUnavailable
                | ErrorKind::EmbeddingError
                | ErrorKind::GenerationUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
