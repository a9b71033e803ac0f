//! SQLite-backed index
//!
//! Chunks, their metadata and their embeddings (JSON arrays) live in a single
//! SQLite file. Searches load the candidate rows and score them with an exact
//! cosine scan on the blocking thread pool, so the async runtime never waits
//! on disk I/O.

use crate::scan::exact_scan;
use crate::{IndexHit, IndexInfo, IndexStore, IndexedChunk, StoreError};
use async_trait::async_trait;
use ragline_domain::{Metadata, MetadataFilter};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// SQLite implementation of [`IndexStore`]
///
/// # Thread Safety
///
/// The connection sits behind a mutex; clones share it.
#[derive(Clone)]
pub struct SqliteIndex {
    name: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndex {
    /// Open (or create) an index at the given path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ragline_store::SqliteIndex;
    ///
    /// let index = SqliteIndex::open("ragline.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            name: path.display().to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StoreError> {
        conn.lock()
            .map_err(|_| StoreError::Unavailable("index connection poisoned".to_string()))
    }

    /// Store a chunk, replacing any chunk with the same id
    pub fn insert(&self, chunk: &IndexedChunk) -> Result<(), StoreError> {
        self.insert_batch(std::slice::from_ref(chunk))
    }

    /// Store several chunks in one transaction
    ///
    /// # Errors
    ///
    /// [`StoreError::DimensionMismatch`] if any embedding disagrees with the
    /// index dimension (fixed by the first chunk ever stored), and
    /// [`StoreError::InvalidData`] for a chunk id that cannot be cited.
    /// Nothing is written in either case.
    pub fn insert_batch(&self, chunks: &[IndexedChunk]) -> Result<(), StoreError> {
        for chunk in chunks {
            chunk.validate()?;
        }
        let mut conn = Self::lock(&self.conn)?;
        let tx = conn.transaction()?;

        let mut dimension = stored_dimension(&tx)?;
        for chunk in chunks {
            let actual = chunk.embedding.len();
            match dimension {
                Some(expected) if expected != actual => {
                    return Err(StoreError::DimensionMismatch { expected, actual });
                }
                Some(_) => {}
                None => {
                    tx.execute(
                        "INSERT INTO index_meta (key, value) VALUES ('dimension', ?1)",
                        params![actual.to_string()],
                    )?;
                    dimension = Some(actual);
                }
            }

            let embedding = serde_json::to_string(&chunk.embedding)
                .map_err(|e| StoreError::InvalidData(format!("embedding: {}", e)))?;
            let metadata = serde_json::to_string(&chunk.metadata)
                .map_err(|e| StoreError::InvalidData(format!("metadata: {}", e)))?;
            let updated_at = chunk
                .document_updated_at
                .map(|t| i64::try_from(t).unwrap_or(i64::MAX));

            tx.execute(
                "INSERT OR REPLACE INTO chunks
                 (chunk_id, source_document_id, text, embedding, metadata, document_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.chunk_id,
                    chunk.source_document_id,
                    chunk.text,
                    embedding,
                    metadata,
                    updated_at,
                ],
            )?;
        }

        tx.commit()?;
        debug!(count = chunks.len(), index = %self.name, "Inserted chunks");
        Ok(())
    }

    fn load_all(conn: &Connection) -> Result<Vec<IndexedChunk>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT chunk_id, source_document_id, text, embedding, metadata, document_updated_at
             FROM chunks",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            let (chunk_id, source_document_id, text, embedding, metadata, updated_at) = row?;
            let embedding: Vec<f32> = serde_json::from_str(&embedding).map_err(|e| {
                StoreError::InvalidData(format!("embedding of {}: {}", chunk_id, e))
            })?;
            let metadata: Metadata = serde_json::from_str(&metadata).map_err(|e| {
                StoreError::InvalidData(format!("metadata of {}: {}", chunk_id, e))
            })?;
            chunks.push(IndexedChunk {
                chunk_id,
                source_document_id,
                text,
                embedding,
                metadata,
                document_updated_at: updated_at.and_then(|t| u64::try_from(t).ok()),
            });
        }
        Ok(chunks)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = Self::lock(&conn)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("index task failed: {}", e)))?
    }
}

fn stored_dimension(conn: &Connection) -> Result<Option<usize>, StoreError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'dimension'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|v| {
            v.parse::<usize>()
                .map_err(|e| StoreError::InvalidData(format!("dimension '{}': {}", v, e)))
        })
        .transpose()
}

#[async_trait]
impl IndexStore for SqliteIndex {
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        filters: &MetadataFilter,
    ) -> Result<Vec<IndexHit>, StoreError> {
        let vector = vector.to_vec();
        let filters = filters.clone();
        self.blocking(move |conn| {
            if let Some(expected) = stored_dimension(conn)? {
                if expected != vector.len() {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
            }
            let chunks = Self::load_all(conn)?;
            exact_scan(&chunks, &vector, k, &filters)
        })
        .await
    }

    async fn health_check(&self) -> bool {
        let result = self
            .blocking(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(StoreError::from)
            })
            .await;
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(index = %self.name, error = %e, "Index health check failed");
                false
            }
        }
    }

    async fn info(&self) -> Result<IndexInfo, StoreError> {
        let name = self.name.clone();
        self.blocking(move |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
            Ok(IndexInfo {
                name,
                chunk_count: usize::try_from(count).unwrap_or(0),
                dimension: stored_dimension(conn)?,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        assert!(SqliteIndex::open(":memory:").is_ok());
    }

    #[test]
    fn test_batch_rejects_mixed_dimensions_atomically() {
        let index = SqliteIndex::open(":memory:").unwrap();
        let result = index.insert_batch(&[
            IndexedChunk::new("a", "d", "x", vec![1.0, 0.0]),
            IndexedChunk::new("b", "d", "y", vec![1.0]),
        ]);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));

        let conn = index.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
