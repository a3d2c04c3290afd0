//! Output types for the semantic chunker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::IngestError;

/// Errors local to the chunking service.
#[derive(Debug, thiserror::Error)]
pub enum ChunkingError {
    #[error("invalid chunking configuration: {0}")]
    Config(String),

    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl From<ChunkingError> for IngestError {
    fn from(err: ChunkingError) -> Self {
        match err {
            ChunkingError::Config(msg) => IngestError::SplitConfig(msg),
            ChunkingError::Embedding(msg) => IngestError::Embedding(msg),
        }
    }
}

/// One semantically-coherent chunk of a source text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub id: Uuid,
    pub content: String,
    pub char_count: usize,
    pub sentence_count: usize,
}

impl SemanticChunk {
    pub fn new(content: String, sentence_count: usize) -> Self {
        let char_count = content.chars().count();
        Self {
            id: Uuid::new_v4(),
            content,
            char_count,
            sentence_count,
        }
    }
}

/// Aggregate numbers for one chunking run.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub total_sentences: usize,
    pub total_chunks: usize,
    pub average_chars: f32,
}

/// Chunks plus run statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingOutcome {
    pub chunks: Vec<SemanticChunk>,
    pub stats: ChunkingStats,
}

/// Observability record emitted alongside every chunking response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkTelemetry {
    pub embedder: String,
    pub strategy: String,
    pub smoothing_window: Option<usize>,
    pub duration_ms: u64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub fallback_used: bool,
    pub chunk_count: usize,
    pub average_chars: f32,
}
