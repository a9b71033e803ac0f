//! Error types for generation

use ragline_domain::ErrorKind;
use thiserror::Error;

/// Errors that can occur during generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    /// A provider attempt exceeded its time limit
    #[error("Generation timed out after {timeout_ms}ms")]
    Timeout {
        /// The limit that was exceeded
        timeout_ms: u64,
    },

    /// The provider kept failing with transient errors
    #[error("Generation provider unavailable after {attempts} attempt(s): {message}")]
    Unavailable {
        /// Attempts made
        attempts: u32,
        /// Last failure
        message: String,
    },

    /// The provider failed in a way retrying cannot fix
    #[error("Generation provider rejected the request: {0}")]
    Rejected(String),

    /// The consumer cancelled generation
    #[error("Generation cancelled")]
    Cancelled,
}

impl GeneratorError {
    /// Caller-visible classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeneratorError::Timeout { .. } => ErrorKind::GenerationTimeout,
            GeneratorError::Unavailable { .. } | GeneratorError::Rejected(_) => {
                ErrorKind::GenerationUnavailable
            }
            GeneratorError::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            GeneratorError::Timeout { timeout_ms: 5 }.kind(),
            ErrorKind::GenerationTimeout
        );
        assert_eq!(
            GeneratorError::Rejected("no".into()).kind(),
            ErrorKind::GenerationUnavailable
        );
        assert_eq!(GeneratorError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
