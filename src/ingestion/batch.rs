//! Turns split chunks into store-ready records with embeddings.
//!
//! Embedding is all-or-nothing: any provider failure, count mismatch, or
//! wrong dimensionality fails the whole batch before the store sees a
//! single record, so partial persistence cannot happen here.

use crate::embeddings::EmbeddingProvider;
use crate::stores::ChunkRecord;
use crate::types::{Chunk, IngestError};

/// Stable id for a chunk, derived from its source, position, and content.
///
/// Re-ingesting the same document produces the same ids, so upserts replace
/// earlier rows instead of accumulating duplicates across retries.
pub fn chunk_id(source: &str, chunk_index: usize, content: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut high = DefaultHasher::new();
    source.hash(&mut high);
    chunk_index.hash(&mut high);
    content.hash(&mut high);

    let mut low = DefaultHasher::new();
    content.hash(&mut low);
    chunk_index.hash(&mut low);
    source.hash(&mut low);

    format!("{:016x}{:016x}", high.finish(), low.finish())
}

/// Chunk records with their embeddings, ready to be upserted as one unit.
#[derive(Clone, Debug, Default)]
pub struct ChunkBatch {
    records: Vec<ChunkRecord>,
}

impl ChunkBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChunkRecord> {
        self.records
    }
}

/// Embeds every chunk and pairs it with a fresh record.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: Vec<Chunk>,
) -> Result<ChunkBatch, IngestError> {
    if chunks.is_empty() {
        return Ok(ChunkBatch::default());
    }

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let batch_size = provider.max_batch_size().max(1);
    let mut vectors = Vec::with_capacity(texts.len());
    for slice in texts.chunks(batch_size) {
        let embedded = provider.embed_batch(slice).await?;
        if embedded.len() != slice.len() {
            return Err(IngestError::Embedding(format!(
                "provider returned {} vectors for {} inputs",
                embedded.len(),
                slice.len()
            )));
        }
        vectors.extend(embedded);
    }

    let dimensions = provider.dimensions();
    for vector in &vectors {
        if vector.len() != dimensions {
            return Err(IngestError::Embedding(format!(
                "provider '{}' returned a {}-dimensional vector, expected {}",
                provider.name(),
                vector.len(),
                dimensions
            )));
        }
    }

    let mut records = Vec::with_capacity(chunks.len());
    for (chunk, vector) in chunks.into_iter().zip(vectors) {
        let metadata = serde_json::to_value(&chunk.metadata)
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        records.push(ChunkRecord {
            id: chunk_id(&chunk.metadata.source, chunk.chunk_index, &chunk.content),
            source: chunk.metadata.source,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            metadata,
            embedding: Some(vector),
        });
    }

    Ok(ChunkBatch { records })
}
