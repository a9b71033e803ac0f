//! Caller-visible query failures

use crate::api::ErrorResponse;
use ragline_domain::ErrorKind;
use ragline_generator::GeneratorError;
use ragline_retriever::RetrieverError;
use thiserror::Error;

/// Why a query did not complete
///
/// Messages are meant for the caller: they name the failing stage but never
/// carry provider payloads.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct QueryFailure {
    /// Stable classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Answer text produced before the failure, if any
    pub partial_answer: Option<String>,
}

impl QueryFailure {
    /// Create a failure
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            partial_answer: None,
        }
    }

    /// Rejected before dispatch
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery, message)
    }

    /// Cancelled by the caller
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "Request cancelled")
    }

    /// The request deadline expired
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self::new(
            ErrorKind::OrchestratorTimeout,
            format!("Request exceeded {}ms", timeout_ms),
        )
    }

    /// Attach text produced before the failure
    pub fn with_partial_answer(mut self, partial: impl Into<String>) -> Self {
        let partial = partial.into();
        self.partial_answer = (!partial.is_empty()).then_some(partial);
        self
    }

    /// Stable error body
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.kind, self.message.clone())
    }

    /// Rebuild a failure from a `failed` event
    ///
    /// Unknown kinds are read as cancellations.
    pub fn from_response(response: ErrorResponse, partial_answer: Option<String>) -> Self {
        let kind = ErrorKind::parse(&response.error).unwrap_or(ErrorKind::Cancelled);
        Self::new(kind, response.message).with_partial_answer(partial_answer.unwrap_or_default())
    }

    pub(crate) fn from_retrieval(error: &RetrieverError, attempts: u32) -> Self {
        let message = match error {
            RetrieverError::Embedding(_) => "Failed to embed the question".to_string(),
            RetrieverError::NoIndex => "No index is configured".to_string(),
            RetrieverError::InvalidK(k) => format!("Invalid chunk count {}", k),
            RetrieverError::Unavailable { index, .. } => {
                format!("Index '{}' unavailable after {} attempt(s)", index, attempts)
            }
        };
        Self::new(error.kind(), message)
    }

    pub(crate) fn from_generation(error: &GeneratorError) -> Self {
        let message = match error {
            GeneratorError::Timeout { timeout_ms } => {
                format!("Generation did not finish within {}ms", timeout_ms)
            }
            GeneratorError::Unavailable { attempts, .. } => {
                format!("Generation provider unavailable after {} attempt(s)", attempts)
            }
            GeneratorError::Rejected(_) => "Generation provider rejected the request".to_string(),
            GeneratorError::Cancelled => "Request cancelled".to_string(),
        };
        Self::new(error.kind(), message)
    }
}
