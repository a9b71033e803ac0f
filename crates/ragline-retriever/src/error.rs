//! Error types for retrieval

use ragline_domain::{ErrorKind, Retryable};
use ragline_store::{EmbeddingError, StoreError};
use thiserror::Error;

/// Errors that can occur during retrieval
#[derive(Error, Debug)]
pub enum RetrieverError {
    /// Requested chunk count was zero
    #[error("k must be greater than 0, got {0}")]
    InvalidK(usize),

    /// No index store is configured
    #[error("No index configured")]
    NoIndex,

    /// The question could not be embedded
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// An index store failed
    #[error("Index '{index}' unavailable: {source}")]
    Unavailable {
        /// Name of the failing index
        index: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

impl RetrieverError {
    /// Caller-visible classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrieverError::InvalidK(_) => ErrorKind::InvalidQuery,
            RetrieverError::Embedding(_) => ErrorKind::EmbeddingError,
            RetrieverError::NoIndex | RetrieverError::Unavailable { .. } => {
                ErrorKind::RetrievalUnavailable
            }
        }
    }
}

impl Retryable for RetrieverError {
    fn is_transient(&self) -> bool {
        match self {
            RetrieverError::InvalidK(_) | RetrieverError::NoIndex => false,
            RetrieverError::Embedding(e) => e.is_transient(),
            RetrieverError::Unavailable { source, .. } => source.is_transient(),
        }
    }
}
