//! In-memory vector store.
//!
//! Brute-force scan over all records; fine for tests and small corpora,
//! and the substitute implementation that keeps pipeline tests off disk.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::IngestError;

use super::{ChunkRecord, DistanceMetric, ScoredChunk, VectorStore};

pub struct InMemoryVectorStore {
    records: RwLock<Vec<ChunkRecord>>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            dimensions,
            metric,
        }
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .field("dimensions", &self.dimensions)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

fn validate_batch(chunks: &[ChunkRecord], dimensions: usize) -> Result<(), IngestError> {
    for chunk in chunks {
        match &chunk.embedding {
            None => {
                return Err(IngestError::StoreWrite(format!(
                    "chunk {} has no embedding",
                    chunk.id
                )));
            }
            Some(embedding) if embedding.len() != dimensions => {
                return Err(IngestError::StoreWrite(format!(
                    "chunk {} embedding has {} dimensions, store expects {}",
                    chunk.id,
                    embedding.len(),
                    dimensions
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), IngestError> {
        if chunks.is_empty() {
            return Ok(());
        }
        // Validate up front so a bad record cannot leave the batch half-applied.
        validate_batch(&chunks, self.dimensions)?;

        let mut records = self.records.write();
        for chunk in chunks {
            records.retain(|existing| existing.id != chunk.id);
            records.push(chunk);
        }
        Ok(())
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
        let records = self.records.read();
        let mut scored: Vec<ScoredChunk> = records
            .iter()
            .filter_map(|record| {
                let embedding = record.embedding.as_ref()?;
                Some(ScoredChunk {
                    record: record.clone(),
                    distance: self.metric.distance(query_embedding, embedding),
                })
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, IngestError> {
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|record| record.source == source)
            .cloned()
            .collect())
    }

    async fn chunk_by_id(&self, id: &str) -> Result<Option<ChunkRecord>, IngestError> {
        let records = self.records.read();
        Ok(records.iter().find(|record| record.id == id).cloned())
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, IngestError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| record.source != source);
        Ok(before - records.len())
    }

    async fn count(&self) -> Result<usize, IngestError> {
        Ok(self.records.read().len())
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
