//! Ragline Generation Provider Layer
//!
//! Pluggable text-generation backends behind one async interface.
//!
//! # Providers
//!
//! - `MockProvider`: scripted, deterministic responses for tests
//! - `OllamaProvider`: local Ollama API, blocking or streamed
//!
//! Providers do not retry. Retry, timeout and cancellation policy belong to
//! the caller; errors say whether they are worth retrying through
//! [`Retryable`].
//!
//! # Examples
//!
//! ```
//! use ragline_llm::{GenerationProvider, MockProvider};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.complete("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod mock;
pub mod ollama;

use async_trait::async_trait;
use futures::Stream;
use ragline_domain::Retryable;
use std::pin::Pin;
use thiserror::Error;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl Retryable for LlmError {
    fn is_transient(&self) -> bool {
        matches!(self, LlmError::Communication(_) | LlmError::RateLimitExceeded)
    }
}

/// Lazily produced answer fragments
///
/// Dropping the stream stops consumption of provider output.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A text-generation backend
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate the full completion for `prompt`
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Start a streamed completion for `prompt`
    ///
    /// Errors that happen before any output (connection refused, unknown
    /// model) are returned here; later failures arrive as stream items.
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream, LlmError>;

    /// Model identifier, for logs and traces
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(LlmError::Communication("reset".into()).is_transient());
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(!LlmError::ModelNotAvailable("llama".into()).is_transient());
        assert!(!LlmError::InvalidResponse("garbage".into()).is_transient());
        assert!(!LlmError::Other("boom".into()).is_transient());
    }
}
