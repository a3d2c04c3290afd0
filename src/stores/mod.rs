//! Vector store backends for chunk persistence and similarity lookup.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!       ┌─────────────┐          ┌─────────────┐
//!       │   SQLite    │          │  in-memory  │
//!       │ sqlite-vec  │          │ brute-force │
//!       └─────────────┘          └─────────────┘
//! ```
//!
//! Both backends speak [`ChunkRecord`], so pipeline code works against
//! either without change; the in-memory store doubles as the test
//! substitute for the durable one.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embeddings::cosine_similarity;
use crate::types::IngestError;

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// Distance metric a collection is configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
    Dot,
}

impl DistanceMetric {
    pub fn label(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Dot => "dot",
        }
    }

    /// Distance between two vectors; smaller is always more similar.
    ///
    /// Dot product is negated so ascending order ranks best-first like the
    /// other metrics.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| {
                    let diff = x - y;
                    diff * diff
                })
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Dot => -a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>(),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A chunk with its embedding, ready for storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this chunk.
    pub id: String,
    /// Source file path this chunk came from.
    pub source: String,
    /// Zero-based index of this chunk within its source document.
    pub chunk_index: usize,
    /// The chunk text.
    pub content: String,
    /// Inherited document metadata as JSON.
    pub metadata: serde_json::Value,
    /// The embedding vector, if computed.
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        chunk_index: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            chunk_index,
            content: content.into(),
            metadata: serde_json::Value::Object(Default::default()),
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// One similarity-search result; `distance` is under the store's metric,
/// so results come back ordered ascending.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// Unified interface over chunk storage backends.
///
/// Upserts are atomic per batch: a rejected batch leaves the collection
/// unchanged, so retries after upstream failures cannot produce partially
/// visible state.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces a batch of chunk records.
    ///
    /// Every record must carry an embedding of the store's dimensionality;
    /// any violation rejects the whole batch.
    async fn upsert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), IngestError>;

    /// Nearest chunks to `query_embedding`, ascending by distance.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IngestError>;

    /// All chunks loaded from a given source path.
    async fn chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, IngestError>;

    /// A single chunk by id.
    async fn chunk_by_id(&self, id: &str) -> Result<Option<ChunkRecord>, IngestError>;

    /// Removes all chunks from a source; returns how many went away.
    async fn delete_by_source(&self, source: &str) -> Result<usize, IngestError>;

    /// Total chunks in the collection.
    async fn count(&self) -> Result<usize, IngestError>;

    /// The metric this collection was configured with.
    fn metric(&self) -> DistanceMetric;
}
