//! Exact cosine scan shared by the reference stores

use crate::{cosine_similarity, IndexHit, IndexedChunk, StoreError};
use ragline_domain::MetadataFilter;
use std::cmp::Ordering;

/// Score every chunk that passes `filters` and keep the best `k`
///
/// Ties are broken by chunk id so the scan itself is deterministic.
pub(crate) fn exact_scan<'a, I>(
    chunks: I,
    vector: &[f32],
    k: usize,
    filters: &MetadataFilter,
) -> Result<Vec<IndexHit>, StoreError>
where
    I: IntoIterator<Item = &'a IndexedChunk>,
{
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for chunk in chunks {
        if !filters.matches(&chunk.metadata) {
            continue;
        }
        if chunk.embedding.len() != vector.len() {
            return Err(StoreError::DimensionMismatch {
                expected: chunk.embedding.len(),
                actual: vector.len(),
            });
        }
        hits.push(IndexHit {
            chunk_id: chunk.chunk_id.clone(),
            source_document_id: chunk.source_document_id.clone(),
            score: cosine_similarity(vector, &chunk.embedding),
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            document_updated_at: chunk.document_updated_at,
        });
    }

    hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.chunk_id.cmp(&b.chunk_id),
        other => other,
    });
    hits.truncate(k);
    Ok(hits)
}
