//! SQLite-backed vector store using the `sqlite-vec` extension.
//!
//! Chunk rows live in a plain `chunks` table; their vectors live in a
//! `chunks_embeddings` `vec0` virtual table joined by rowid. Each upsert
//! batch runs in a single transaction, so a failed batch leaves the
//! collection exactly as it was.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, OptionalExtension, ffi, rusqlite};

use crate::types::IngestError;

use super::{ChunkRecord, DistanceMetric, ScoredChunk, VectorStore};

pub struct SqliteVectorStore {
    conn: Connection,
    dimensions: usize,
    metric: DistanceMetric,
}

impl SqliteVectorStore {
    /// Opens (or creates) a collection at `path`.
    ///
    /// `dimensions` fixes the width of every stored vector. `sqlite-vec`
    /// exposes cosine and L2 distance only, so `DistanceMetric::Dot` is
    /// rejected here; use [`super::InMemoryVectorStore`] for dot-product
    /// ranking.
    pub async fn open(
        path: impl AsRef<Path>,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<Self, IngestError> {
        if metric == DistanceMetric::Dot {
            return Err(IngestError::Storage(
                "sqlite-vec backend supports cosine and euclidean metrics only".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(IngestError::Storage(
                "embedding dimensionality must be positive".to_string(),
            ));
        }

        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))?;

        conn.call(move |conn| {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS chunks (
                    id TEXT PRIMARY KEY,
                    source TEXT NOT NULL,
                    chunk_index INTEGER NOT NULL,
                    metadata TEXT NOT NULL,
                    content TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)",
                [],
            )?;
            conn.execute(
                &format!(
                    "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_embeddings \
                     USING vec0(embedding float[{dimensions}])"
                ),
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
            IngestError::Storage(err.to_string())
        })?;

        Ok(Self {
            conn,
            dimensions,
            metric,
        })
    }

    fn register_sqlite_vec() -> Result<(), IngestError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(IngestError::Storage)
    }

    fn distance_fn(&self) -> &'static str {
        match self.metric {
            DistanceMetric::Cosine => "vec_distance_cosine",
            DistanceMetric::Euclidean => "vec_distance_l2",
            DistanceMetric::Dot => unreachable!("rejected at open"),
        }
    }
}

struct InsertRow {
    id: String,
    source: String,
    chunk_index: i64,
    metadata: String,
    content: String,
    embedding_json: String,
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), IngestError> {
        if chunks.is_empty() {
            return Ok(());
        }

        // Validate and serialize everything up front so the transaction
        // below only ever sees well-formed rows.
        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = match &chunk.embedding {
                None => {
                    return Err(IngestError::StoreWrite(format!(
                        "chunk {} has no embedding",
                        chunk.id
                    )));
                }
                Some(embedding) if embedding.len() != self.dimensions => {
                    return Err(IngestError::StoreWrite(format!(
                        "chunk {} embedding has {} dimensions, store expects {}",
                        chunk.id,
                        embedding.len(),
                        self.dimensions
                    )));
                }
                Some(embedding) => embedding,
            };
            let embedding_json = serde_json::to_string(embedding)
                .map_err(|err| IngestError::StoreWrite(err.to_string()))?;
            rows.push(InsertRow {
                id: chunk.id.clone(),
                source: chunk.source.clone(),
                chunk_index: chunk.chunk_index as i64,
                metadata: chunk.metadata.to_string(),
                content: chunk.content.clone(),
                embedding_json,
            });
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for row in rows {
                    // Replace any previous version of this chunk id, vector
                    // row included.
                    tx.execute(
                        "DELETE FROM chunks_embeddings WHERE rowid IN \
                         (SELECT rowid FROM chunks WHERE id = ?1)",
                        [&row.id],
                    )?;
                    tx.execute("DELETE FROM chunks WHERE id = ?1", [&row.id])?;

                    tx.execute(
                        "INSERT INTO chunks (id, source, chunk_index, metadata, content) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        (
                            &row.id,
                            &row.source,
                            row.chunk_index,
                            &row.metadata,
                            &row.content,
                        ),
                    )?;
                    let rowid = tx.last_insert_rowid();
                    tx.execute(
                        "INSERT INTO chunks_embeddings (rowid, embedding) VALUES (?1, ?2)",
                        (rowid, &row.embedding_json),
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::StoreWrite(err.to_string())
            })
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IngestError> {
        if query_embedding.len() != self.dimensions {
            return Err(IngestError::Storage(format!(
                "query embedding has {} dimensions, store expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        let sql = format!(
            "SELECT c.id, c.source, c.chunk_index, c.content, c.metadata, \
             {}(e.embedding, vec_f32(?1)) AS distance \
             FROM chunks c \
             JOIN chunks_embeddings e ON c.rowid = e.rowid \
             ORDER BY distance ASC \
             LIMIT {}",
            self.distance_fn(),
            top_k
        );

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([&embedding_json], |row| {
                    let record = ChunkRecord {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        chunk_index: row.get::<_, i64>(2)?.max(0) as usize,
                        content: row.get(3)?,
                        metadata: row
                            .get::<_, String>(4)
                            .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                            .unwrap_or_default(),
                        embedding: None,
                    };
                    let distance: f32 = row.get(5)?;
                    Ok(ScoredChunk { record, distance })
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::Storage(err.to_string())
            })
    }

    async fn chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, IngestError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, source, chunk_index, content, metadata FROM chunks \
                     WHERE source = ?1 ORDER BY chunk_index ASC",
                )?;
                let rows = stmt.query_map([&source], |row| {
                    Ok(ChunkRecord {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        chunk_index: row.get::<_, i64>(2)?.max(0) as usize,
                        content: row.get(3)?,
                        metadata: row
                            .get::<_, String>(4)
                            .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                            .unwrap_or_default(),
                        embedding: None,
                    })
                })?;
                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::Storage(err.to_string())
            })
    }

    async fn chunk_by_id(&self, id: &str) -> Result<Option<ChunkRecord>, IngestError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, source, chunk_index, content, metadata FROM chunks WHERE id = ?1",
                )?;
                let result = stmt
                    .query_row([&id], |row| {
                        Ok(ChunkRecord {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            chunk_index: row.get::<_, i64>(2)?.max(0) as usize,
                            content: row.get(3)?,
                            metadata: row
                                .get::<_, String>(4)
                                .map(|raw| serde_json::from_str(&raw).unwrap_or_default())
                                .unwrap_or_default(),
                            embedding: None,
                        })
                    })
                    .optional()?;
                Ok(result)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::Storage(err.to_string())
            })
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, IngestError> {
        let source = source.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM chunks_embeddings WHERE rowid IN \
                     (SELECT rowid FROM chunks WHERE source = ?1)",
                    [&source],
                )?;
                let deleted = tx.execute("DELETE FROM chunks WHERE source = ?1", [&source])?;
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::Storage(err.to_string())
            })
    }

    async fn count(&self) -> Result<usize, IngestError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error<rusqlite::Error>| {
                IngestError::Storage(err.to_string())
            })
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
