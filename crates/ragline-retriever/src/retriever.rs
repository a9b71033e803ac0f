//! Core retrieval logic

use crate::{RetrieverConfig, RetrieverError};
use futures::future::join_all;
use ragline_domain::{EvidenceChunk, MetadataFilter};
use ragline_store::{EmbeddingModel, IndexHit, IndexInfo, IndexStore};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Searches one or more index stores for evidence
///
/// Cheap to clone; the embedder and stores are shared.
#[derive(Clone)]
pub struct Retriever {
    config: RetrieverConfig,
    embedder: Arc<dyn EmbeddingModel>,
    stores: Vec<(String, Arc<dyn IndexStore>)>,
}

impl Retriever {
    /// Create a retriever with no stores attached
    pub fn new(config: RetrieverConfig, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            config,
            embedder,
            stores: Vec::new(),
        }
    }

    /// Attach an index store under a display name
    pub fn with_store(mut self, name: impl Into<String>, store: Arc<dyn IndexStore>) -> Self {
        self.stores.push((name.into(), store));
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Number of attached stores
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Retrieve up to `k` chunks relevant to `query_text`
    ///
    /// `k` is capped at the configured `max_k`. `filters` is a conjunctive
    /// metadata pre-filter applied before scoring.
    ///
    /// # Errors
    ///
    /// - [`RetrieverError::InvalidK`] when `k` is 0
    /// - [`RetrieverError::Embedding`] when the question cannot be embedded
    /// - [`RetrieverError::Unavailable`] when any store fails
    pub async fn retrieve(
        &self,
        query_text: &str,
        k: usize,
        filters: &MetadataFilter,
    ) -> Result<Vec<EvidenceChunk>, RetrieverError> {
        if k == 0 {
            return Err(RetrieverError::InvalidK(k));
        }
        if self.stores.is_empty() {
            return Err(RetrieverError::NoIndex);
        }
        let k = k.min(self.config.max_k);

        let vector = self.embedder.embed(query_text).await?;

        let searches = self.stores.iter().map(|(name, store)| {
            let vector = &vector;
            async move { (name, store.search(vector, k, filters).await) }
        });

        let mut merged: HashMap<String, IndexHit> = HashMap::new();
        for (name, result) in join_all(searches).await {
            let hits = result.map_err(|source| RetrieverError::Unavailable {
                index: name.clone(),
                source,
            })?;
            debug!(index = %name, hits = hits.len(), "Index searched");

            for hit in hits {
                if !filters.matches(&hit.metadata) {
                    warn!(index = %name, chunk_id = %hit.chunk_id, "Index returned a hit outside the filter");
                    continue;
                }
                merge_hit(&mut merged, hit);
            }
        }

        let mut chunks: Vec<EvidenceChunk> = merged
            .into_values()
            .filter(|hit| self.config.min_score.map_or(true, |min| hit.score >= min))
            .map(IndexHit::into_evidence)
            .collect();

        sort_evidence(&mut chunks);
        chunks.truncate(k);
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.rank = i + 1;
        }

        debug!(k, returned = chunks.len(), "Retrieval complete");
        Ok(chunks)
    }

    /// Whether every attached store is healthy
    pub async fn health_check(&self) -> bool {
        if self.stores.is_empty() {
            return false;
        }
        let checks = self.stores.iter().map(|(_, store)| store.health_check());
        join_all(checks).await.into_iter().all(|healthy| healthy)
    }

    /// Describe every attached store; stores that fail to answer are skipped
    pub async fn index_info(&self) -> Vec<IndexInfo> {
        let infos = self.stores.iter().map(|(name, store)| async move {
            match store.info().await {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(index = %name, error = %e, "Index info unavailable");
                    None
                }
            }
        });
        join_all(infos).await.into_iter().flatten().collect()
    }
}

/// Keep the best instance of each chunk id
fn merge_hit(merged: &mut HashMap<String, IndexHit>, hit: IndexHit) {
    match merged.get_mut(&hit.chunk_id) {
        Some(existing) => {
            let better = match hit.score.total_cmp(&existing.score) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => match hit.document_updated_at.cmp(&existing.document_updated_at) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => hit.source_document_id < existing.source_document_id,
                },
            };
            if better {
                *existing = hit;
            }
        }
        None => {
            merged.insert(hit.chunk_id.clone(), hit);
        }
    }
}

/// Put evidence into canonical retrieval order
///
/// Score descending, then document recency (newer first, unknown last),
/// then chunk id ascending. The result depends only on the set of chunks,
/// never on their input order.
///
/// # Examples
///
/// ```
/// use ragline_domain::EvidenceChunk;
/// use ragline_retriever::sort_evidence;
///
/// let mut chunks = vec![
///     EvidenceChunk::new("b", "d", "", 0.5),
///     EvidenceChunk::new("c", "d", "", 0.5).with_updated_at(10),
///     EvidenceChunk::new("a", "d", "", 0.9),
///     EvidenceChunk::new("a2", "d", "", 0.5),
/// ];
/// sort_evidence(&mut chunks);
/// let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
/// assert_eq!(ids, vec!["a", "c", "a2", "b"]);
/// ```
pub fn sort_evidence(chunks: &mut [EvidenceChunk]) {
    chunks.sort_by(compare_evidence);
}

fn compare_evidence(a: &EvidenceChunk, b: &EvidenceChunk) -> Ordering {
    b.embedding_score
        .total_cmp(&a.embedding_score)
        .then_with(|| b.document_updated_at.cmp(&a.document_updated_at))
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, doc: &str, score: f32, updated: Option<u64>) -> IndexHit {
        IndexHit {
            chunk_id: id.to_string(),
            source_document_id: doc.to_string(),
            score,
            text: id.to_string(),
            metadata: Default::default(),
            document_updated_at: updated,
        }
    }

    #[test]
    fn test_merge_keeps_highest_score() {
        let mut merged = HashMap::new();
        merge_hit(&mut merged, hit("c", "d", 0.4, None));
        merge_hit(&mut merged, hit("c", "d", 0.8, None));
        merge_hit(&mut merged, hit("c", "d", 0.6, None));
        assert_eq!(merged["c"].score, 0.8);
    }

    #[test]
    fn test_merge_is_order_independent_on_ties() {
        let mut forward = HashMap::new();
        merge_hit(&mut forward, hit("c", "x", 0.5, Some(1)));
        merge_hit(&mut forward, hit("c", "y", 0.5, Some(1)));

        let mut backward = HashMap::new();
        merge_hit(&mut backward, hit("c", "y", 0.5, Some(1)));
        merge_hit(&mut backward, hit("c", "x", 0.5, Some(1)));

        assert_eq!(forward["c"], backward["c"]);
        assert_eq!(forward["c"].source_document_id, "x");
    }

    #[test]
    fn test_unknown_recency_sorts_last() {
        let mut chunks = vec![
            EvidenceChunk::new("a", "d", "", 0.5),
            EvidenceChunk::new("b", "d", "", 0.5).with_updated_at(1),
        ];
        sort_evidence(&mut chunks);
        assert_eq!(chunks[0].chunk_id, "b");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn chunk_set() -> impl Strategy<Value = Vec<EvidenceChunk>> {
        prop::collection::vec(
            (0u8..4, prop::option::of(0u64..3)),
            0..20,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (score, updated))| {
                    let mut chunk =
                        EvidenceChunk::new(format!("chunk-{:02}", i), "doc", "", score as f32 / 4.0);
                    chunk.document_updated_at = updated;
                    chunk
                })
                .collect()
        })
    }

    proptest! {
        /// Order depends only on the set of chunks
        #[test]
        fn test_sort_is_permutation_invariant(
            (original, shuffled) in chunk_set().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let mut a = original;
            let mut b = shuffled;
            sort_evidence(&mut a);
            sort_evidence(&mut b);
            prop_assert_eq!(a, b);
        }

        /// Adjacent pairs respect score, then recency, then id
        #[test]
        fn test_sort_respects_keys(chunks in chunk_set()) {
            let mut chunks = chunks;
            sort_evidence(&mut chunks);
            for pair in chunks.windows(2) {
                prop_assert_ne!(compare_evidence(&pair[0], &pair[1]), Ordering::Greater);
                prop_assert!(pair[0].embedding_score >= pair[1].embedding_score);
            }
        }
    }
}
