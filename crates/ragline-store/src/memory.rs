//! In-process index

use crate::scan::exact_scan;
use crate::{IndexHit, IndexInfo, IndexStore, IndexedChunk, StoreError};
use async_trait::async_trait;
use ragline_domain::MetadataFilter;

/// Index held entirely in memory
///
/// Built up front with [`MemoryIndex::insert`] and then shared read-only
/// (typically behind an `Arc`). Searches are exact cosine scans.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    name: String,
    chunks: Vec<IndexedChunk>,
}

impl MemoryIndex {
    /// Create an empty index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: Vec::new(),
        }
    }

    /// Add a chunk, replacing any chunk with the same id
    ///
    /// # Errors
    ///
    /// [`StoreError::DimensionMismatch`] when the embedding length differs
    /// from the chunks already stored, [`StoreError::InvalidData`] for a
    /// chunk id that cannot be cited.
    pub fn insert(&mut self, chunk: IndexedChunk) -> Result<(), StoreError> {
        chunk.validate()?;
        if let Some(expected) = self.dimension() {
            if chunk.embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: chunk.embedding.len(),
                });
            }
        }
        match self.chunks.iter_mut().find(|c| c.chunk_id == chunk.chunk_id) {
            Some(existing) => *existing = chunk,
            None => self.chunks.push(chunk),
        }
        Ok(())
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, if any chunk is stored
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len())
    }
}

#[async_trait]
impl IndexStore for MemoryIndex {
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filters: &MetadataFilter,
    ) -> Result<Vec<IndexHit>, StoreError> {
        exact_scan(&self.chunks, vector, k, filters)
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn info(&self) -> Result<IndexInfo, StoreError> {
        Ok(IndexInfo {
            name: self.name.clone(),
            chunk_count: self.chunks.len(),
            dimension: self.dimension(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_id() {
        let mut index = MemoryIndex::new("t");
        index.insert(IndexedChunk::new("a", "d", "old", vec![1.0, 0.0])).unwrap();
        index.insert(IndexedChunk::new("a", "d", "new", vec![0.0, 1.0])).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.chunks[0].text, "new");
    }

    #[test]
    fn test_insert_rejects_other_dimension() {
        let mut index = MemoryIndex::new("t");
        index.insert(IndexedChunk::new("a", "d", "x", vec![1.0, 0.0])).unwrap();
        let result = index.insert(IndexedChunk::new("b", "d", "y", vec![1.0]));
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_search_and_info() {
        let mut index = MemoryIndex::new("docs");
        index.insert(IndexedChunk::new("a", "d", "x", vec![1.0, 0.0])).unwrap();
        index.insert(IndexedChunk::new("b", "d", "y", vec![0.0, 1.0])).unwrap();

        let hits = index.search(&[0.0, 1.0], 1, &MetadataFilter::new()).await.unwrap();
        assert_eq!(hits[0].chunk_id, "b");

        let info = index.info().await.unwrap();
        assert_eq!(info.name, "docs");
        assert_eq!(info.chunk_count, 2);
        assert_eq!(info.dimension, Some(2));
        assert!(index.health_check().await);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = MemoryIndex::new("empty");
        let hits = index.search(&[1.0], 4, &MetadataFilter::new()).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.info().await.unwrap().dimension, None);
    }
}
