//! Integration tests for ragline-store
//!
//! These tests drive the reference stores through the `IndexStore` trait
//! with embeddings from the hashing model.

use ragline_domain::MetadataFilter;
use ragline_store::{
    EmbeddingModel, HashingEmbeddingModel, IndexStore, IndexedChunk, MemoryIndex, SqliteIndex,
    StoreError,
};
use std::sync::Arc;
use tempfile::TempDir;

const DOCS: &[(&str, &str, &str, &str)] = &[
    ("solar-1", "solar", "en", "Solar panels convert sunlight into electricity"),
    ("solar-2", "solar", "de", "Solarzellen wandeln Sonnenlicht in Strom um"),
    ("wind-1", "wind", "en", "Wind turbines convert moving air into electricity"),
    ("bread-1", "bread", "en", "Knead the dough and let it rise for an hour"),
];

fn fixture_chunks(model: &HashingEmbeddingModel) -> Vec<IndexedChunk> {
    DOCS.iter()
        .map(|(id, doc, lang, text)| {
            IndexedChunk::new(*id, *doc, *text, model.embed_sync(text).unwrap())
                .with_metadata("lang", *lang)
                .with_updated_at(1_700_000_000)
        })
        .collect()
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    let model = HashingEmbeddingModel::new(256);

    {
        let index = SqliteIndex::open(&path).unwrap();
        index.insert_batch(&fixture_chunks(&model)).unwrap();
    }

    let index = SqliteIndex::open(&path).unwrap();
    let info = index.info().await.unwrap();
    assert_eq!(info.chunk_count, DOCS.len());
    assert_eq!(info.dimension, Some(256));
    assert!(index.health_check().await);
}

#[tokio::test]
async fn test_sqlite_and_memory_agree() {
    let model = HashingEmbeddingModel::new(1024);
    let chunks = fixture_chunks(&model);

    let sqlite = SqliteIndex::open(":memory:").unwrap();
    sqlite.insert_batch(&chunks).unwrap();

    let mut memory = MemoryIndex::new("memory");
    for chunk in chunks {
        memory.insert(chunk).unwrap();
    }

    let stores: Vec<Arc<dyn IndexStore>> = vec![Arc::new(sqlite), Arc::new(memory)];
    let query = model.embed("how is electricity made from sunlight").await.unwrap();

    let mut results = Vec::new();
    for store in &stores {
        let hits = store.search(&query, 3, &MetadataFilter::new()).await.unwrap();
        results.push(hits.into_iter().map(|h| h.chunk_id).collect::<Vec<_>>());
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[0][0], "solar-1");
}

#[tokio::test]
async fn test_filter_applies_before_k() {
    let model = HashingEmbeddingModel::new(256);
    let index = SqliteIndex::open(":memory:").unwrap();
    index.insert_batch(&fixture_chunks(&model)).unwrap();

    let query = model.embed("Solarzellen Strom").await.unwrap();
    let filter = MetadataFilter::new().allow("lang", ["en"]);
    let hits = index.search(&query, 10, &filter).await.unwrap();

    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.metadata.get("lang").map(String::as_str) == Some("en")));
    assert!(hits.iter().all(|h| h.document_updated_at == Some(1_700_000_000)));
}

#[tokio::test]
async fn test_sqlite_dimension_mismatch_on_search() {
    let model = HashingEmbeddingModel::new(64);
    let index = SqliteIndex::open(":memory:").unwrap();
    index.insert_batch(&fixture_chunks(&model)).unwrap();

    let result = index.search(&[1.0, 0.0], 2, &MetadataFilter::new()).await;
    assert!(matches!(
        result,
        Err(StoreError::DimensionMismatch { expected: 64, actual: 2 })
    ));
}

#[tokio::test]
async fn test_sqlite_replace_keeps_single_row() {
    let index = SqliteIndex::open(":memory:").unwrap();
    index.insert(&IndexedChunk::new("c", "d", "first", vec![1.0, 0.0])).unwrap();
    index.insert(&IndexedChunk::new("c", "d", "second", vec![0.0, 1.0])).unwrap();

    let hits = index.search(&[0.0, 1.0], 5, &MetadataFilter::new()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "second");
}

#[tokio::test]
async fn test_uncitable_chunk_ids_are_rejected() {
    let sqlite = SqliteIndex::open(":memory:").unwrap();
    let mut memory = MemoryIndex::new("docs");

    for id in ["  ", "table[2]"] {
        let chunk = IndexedChunk::new(id, "d", "text", vec![1.0, 0.0]);
        assert!(matches!(sqlite.insert(&chunk), Err(StoreError::InvalidData(_))));
        assert!(matches!(memory.insert(chunk), Err(StoreError::InvalidData(_))));
    }

    // one bad id keeps the whole batch out
    let batch = vec![
        IndexedChunk::new("ok", "d", "text", vec![1.0, 0.0]),
        IndexedChunk::new("bad]", "d", "text", vec![0.0, 1.0]),
    ];
    assert!(sqlite.insert_batch(&batch).is_err());
    assert_eq!(sqlite.info().await.unwrap().chunk_count, 0);

    let spaced = IndexedChunk::new("annual report.pdf#4", "d", "text", vec![1.0, 0.0]);
    sqlite.insert(&spaced).unwrap();
    memory.insert(spaced).unwrap();
    assert_eq!(memory.len(), 1);
}
