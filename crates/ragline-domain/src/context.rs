//! Assembled prompt context

use serde::{Deserialize, Serialize};

use crate::EvidenceChunk;

/// Evidence actually included in the prompt
///
/// `total_token_count` never exceeds the budget the context was built with,
/// and `chunks` keep the relative order they had in the retriever output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Included chunks, in rank order
    pub chunks: Vec<EvidenceChunk>,

    /// Sum of the token cost of every included chunk
    pub total_token_count: usize,

    /// Whether the budget forced at least one chunk out
    pub truncated: bool,
}

impl AssembledContext {
    /// A context with no evidence
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether no chunk was included
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of included chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Ids of the included chunks, in order
    pub fn chunk_ids(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.chunk_id.as_str()).collect()
    }

    /// Whether a chunk id is part of this context
    pub fn contains(&self, chunk_id: &str) -> bool {
        self.chunks.iter().any(|c| c.chunk_id == chunk_id)
    }

    /// Chunk texts, in order
    pub fn texts(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.text.as_str()).collect()
    }
}
