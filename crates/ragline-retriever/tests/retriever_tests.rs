//! Integration tests for the retriever against in-memory stores

use async_trait::async_trait;
use ragline_domain::{ErrorKind, MetadataFilter, Retryable};
use ragline_retriever::{Retriever, RetrieverConfig, RetrieverError};
use ragline_store::{
    HashingEmbeddingModel, IndexHit, IndexInfo, IndexStore, IndexedChunk, MemoryIndex, StoreError,
};
use std::sync::Arc;

const DIM: usize = 1024;

fn embedder() -> Arc<HashingEmbeddingModel> {
    Arc::new(HashingEmbeddingModel::new(DIM))
}

fn index_of(name: &str, docs: &[(&str, &str, &str, Option<u64>)]) -> MemoryIndex {
    let model = HashingEmbeddingModel::new(DIM);
    let mut index = MemoryIndex::new(name);
    for (id, doc, text, updated) in docs {
        let mut chunk = IndexedChunk::new(*id, *doc, *text, model.embed_sync(text).unwrap())
            .with_metadata("source", *doc);
        chunk.document_updated_at = *updated;
        index.insert(chunk).unwrap();
    }
    index
}

struct FailingStore {
    error: fn() -> StoreError,
}

#[async_trait]
impl IndexStore for FailingStore {
    async fn search(
        &self,
        _vector: &[f32],
        _k: usize,
        _filters: &MetadataFilter,
    ) -> Result<Vec<IndexHit>, StoreError> {
        Err((self.error)())
    }

    async fn health_check(&self) -> bool {
        false
    }

    async fn info(&self) -> Result<IndexInfo, StoreError> {
        Err((self.error)())
    }
}

#[tokio::test]
async fn test_retrieve_ranks_relevant_chunks_first() {
    let index = index_of(
        "docs",
        &[
            ("solar", "energy", "solar panels turn sunlight into electricity", None),
            ("bread", "baking", "knead the dough and bake the bread", None),
            ("wind", "energy", "wind turbines turn moving air into electricity", None),
        ],
    );
    let retriever = Retriever::new(RetrieverConfig::default(), embedder())
        .with_store("docs", Arc::new(index));

    let chunks = retriever
        .retrieve("how do solar panels make electricity", 2, &MetadataFilter::new())
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_id, "solar");
    assert_eq!(chunks[0].rank, 1);
    assert_eq!(chunks[1].rank, 2);
    assert!(chunks[0].embedding_score >= chunks[1].embedding_score);
}

#[tokio::test]
async fn test_duplicate_chunk_across_stores_is_merged() {
    let docs = [("shared", "doc", "identical text in both stores", None)];
    let retriever = Retriever::new(RetrieverConfig::default(), embedder())
        .with_store("a", Arc::new(index_of("a", &docs)))
        .with_store("b", Arc::new(index_of("b", &docs)));

    let chunks = retriever
        .retrieve("identical text", 4, &MetadataFilter::new())
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
}

#[tokio::test]
async fn test_recency_breaks_score_ties() {
    let text = "the same words in every chunk";
    let index = index_of(
        "docs",
        &[
            ("old", "d1", text, Some(100)),
            ("new", "d2", text, Some(200)),
            ("undated", "d3", text, None),
        ],
    );
    let retriever =
        Retriever::new(RetrieverConfig::default(), embedder()).with_store("docs", Arc::new(index));

    let chunks = retriever.retrieve(text, 3, &MetadataFilter::new()).await.unwrap();
    let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old", "undated"]);
}

#[tokio::test]
async fn test_filters_and_min_score() {
    let index = index_of(
        "docs",
        &[
            ("a", "manual", "reset the router by holding the button", None),
            ("b", "blog", "reset the router by holding the button", None),
            ("c", "manual", "unrelated recipe for pancakes", None),
        ],
    );
    let mut config = RetrieverConfig::default();
    config.min_score = Some(0.3);
    let retriever = Retriever::new(config, embedder()).with_store("docs", Arc::new(index));

    let filter = MetadataFilter::new().allow("source", ["manual"]);
    let chunks = retriever
        .retrieve("how do I reset the router", 4, &filter)
        .await
        .unwrap();

    let ids: Vec<_> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["a"]);
}

#[tokio::test]
async fn test_zero_k_is_invalid_query() {
    let retriever = Retriever::new(RetrieverConfig::default(), embedder())
        .with_store("docs", Arc::new(MemoryIndex::new("docs")));
    let err = retriever
        .retrieve("anything", 0, &MetadataFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieverError::InvalidK(0)));
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);
}

#[tokio::test]
async fn test_k_is_capped() {
    let docs: Vec<(String, String)> = (0..10)
        .map(|i| (format!("c{}", i), format!("shared words chunk {}", i)))
        .collect();
    let model = HashingEmbeddingModel::new(DIM);
    let mut index = MemoryIndex::new("docs");
    for (id, text) in &docs {
        index
            .insert(IndexedChunk::new(id.as_str(), "d", text.as_str(), model.embed_sync(text).unwrap()))
            .unwrap();
    }
    let mut config = RetrieverConfig::default();
    config.max_k = 3;
    let retriever = Retriever::new(config, embedder()).with_store("docs", Arc::new(index));

    let chunks = retriever
        .retrieve("shared words", 10, &MetadataFilter::new())
        .await
        .unwrap();
    assert_eq!(chunks.len(), 3);
}

#[tokio::test]
async fn test_store_failure_surfaces_as_unavailable() {
    let retriever = Retriever::new(RetrieverConfig::default(), embedder())
        .with_store("good", Arc::new(MemoryIndex::new("good")))
        .with_store(
            "bad",
            Arc::new(FailingStore {
                error: || StoreError::Unavailable("connection refused".into()),
            }),
        );

    let err = retriever
        .retrieve("question", 4, &MetadataFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetrievalUnavailable);
    assert!(err.is_transient());
    assert!(!retriever.health_check().await);
    assert_eq!(retriever.index_info().await.len(), 1);
}

#[tokio::test]
async fn test_empty_question_is_embedding_error() {
    let retriever = Retriever::new(RetrieverConfig::default(), embedder())
        .with_store("docs", Arc::new(MemoryIndex::new("docs")));
    let err = retriever
        .retrieve("   ", 4, &MetadataFilter::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmbeddingError);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_no_store_configured() {
    let retriever = Retriever::new(RetrieverConfig::default(), embedder());
    let err = retriever
        .retrieve("question", 4, &MetadataFilter::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieverError::NoIndex));
    assert!(!retriever.health_check().await);
}
