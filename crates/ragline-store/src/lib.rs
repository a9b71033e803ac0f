//! Ragline Storage Layer
//!
//! Index stores and embedding models the retriever searches through.
//!
//! # Architecture
//!
//! - [`IndexStore`]: async similarity search over pre-chunked documents
//! - [`MemoryIndex`]: in-process exact scan (fixtures, tests, small corpora)
//! - [`SqliteIndex`]: SQLite-persisted chunks with exact cosine scan
//! - [`embedding`]: text-to-vector models (hashing and Ollama)
//!
//! Both reference stores score with exact cosine similarity so that results
//! are reproducible; the metadata filter is applied before scoring.
//!
//! # Examples
//!
//! ```
//! use ragline_store::{IndexedChunk, MemoryIndex};
//!
//! let mut index = MemoryIndex::new("docs");
//! index
//!     .insert(IndexedChunk::new("c1", "doc1", "The sky is blue", vec![1.0, 0.0]))
//!     .unwrap();
//! assert_eq!(index.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod memory;
mod scan;
pub mod sqlite;

pub use embedding::{
    cosine_similarity, EmbeddingError, EmbeddingModel, HashingEmbeddingModel,
    OllamaEmbeddingModel,
};
pub use memory::MemoryIndex;
pub use sqlite::SqliteIndex;

use async_trait::async_trait;
use ragline_domain::{EvidenceChunk, Metadata, MetadataFilter, Retryable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Query vector and stored vectors disagree on dimension
    #[error("Dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch {
        /// Dimension of the stored vectors
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Retryable for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Database(_))
    }
}

/// A chunk as stored in an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Unique chunk identifier
    pub chunk_id: String,
    /// The document the chunk was cut from
    pub source_document_id: String,
    /// Chunk text
    pub text: String,
    /// Pre-computed embedding
    pub embedding: Vec<f32>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
    /// Last modification of the source document (Unix seconds)
    #[serde(default)]
    pub document_updated_at: Option<u64>,
}

impl IndexedChunk {
    /// Create a chunk with no metadata
    pub fn new(
        chunk_id: impl Into<String>,
        source_document_id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            source_document_id: source_document_id.into(),
            text: text.into(),
            embedding,
            metadata: Metadata::new(),
            document_updated_at: None,
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the document recency timestamp
    pub fn with_updated_at(mut self, updated_at: u64) -> Self {
        self.document_updated_at = Some(updated_at);
        self
    }

    /// Check that the chunk id can be cited
    ///
    /// Answers cite chunks as `[source:<chunk_id>]`, so an id must not be
    /// blank or contain `]`.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.chunk_id.trim().is_empty() {
            return Err(StoreError::InvalidData("chunk id is blank".to_string()));
        }
        if self.chunk_id.contains(']') {
            return Err(StoreError::InvalidData(format!(
                "chunk id '{}' contains ']'",
                self.chunk_id
            )));
        }
        Ok(())
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    /// Chunk identifier
    pub chunk_id: String,
    /// Owning document
    pub source_document_id: String,
    /// Similarity to the query vector
    pub score: f32,
    /// Chunk text
    pub text: String,
    /// Chunk metadata
    pub metadata: Metadata,
    /// Last modification of the source document (Unix seconds)
    pub document_updated_at: Option<u64>,
}

impl IndexHit {
    /// Convert into an unranked evidence chunk
    pub fn into_evidence(self) -> EvidenceChunk {
        EvidenceChunk {
            chunk_id: self.chunk_id,
            source_document_id: self.source_document_id,
            text: self.text,
            embedding_score: self.score,
            rank: 0,
            metadata: self.metadata,
            document_updated_at: self.document_updated_at,
        }
    }
}

/// Descriptive information about an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Index name (collection or file)
    pub name: String,
    /// Number of stored chunks
    pub chunk_count: usize,
    /// Embedding dimension, unknown while the index is empty
    pub dimension: Option<usize>,
}

/// A searchable index of document chunks
///
/// Searches are read-only and idempotent. Implementations must be safe to
/// share between concurrently running queries.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Return up to `k` chunks most similar to `vector` among those whose
    /// metadata passes `filters`, best first
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filters: &MetadataFilter,
    ) -> Result<Vec<IndexHit>, StoreError>;

    /// Whether the store can currently serve searches
    async fn health_check(&self) -> bool;

    /// Name, size and dimension of the index
    async fn info(&self) -> Result<IndexInfo, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_into_evidence() {
        let hit = IndexHit {
            chunk_id: "c1".to_string(),
            source_document_id: "d1".to_string(),
            score: 0.75,
            text: "text".to_string(),
            metadata: Metadata::new(),
            document_updated_at: Some(5),
        };
        let chunk = hit.into_evidence();
        assert_eq!(chunk.chunk_id, "c1");
        assert_eq!(chunk.embedding_score, 0.75);
        assert_eq!(chunk.rank, 0);
        assert_eq!(chunk.document_updated_at, Some(5));
    }

    #[test]
    fn test_store_error_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(!StoreError::DimensionMismatch { expected: 3, actual: 4 }.is_transient());
        assert!(!StoreError::InvalidData("bad".into()).is_transient());
    }
}
