//! Semantic chunking service.
//!
//! Ties the segmenter, the embedding provider, breakpoint detection, and
//! assembly together behind one handle. Construction goes through the
//! builder; the provider is required, everything else has defaults.

use std::sync::Arc;
use std::time::Instant;

use crate::embeddings::{EmbeddingCache, EmbeddingProvider};
use crate::types::{Chunk, Document};

use super::config::ChunkingConfig;
use super::types::{
    ChunkTelemetry, ChunkingError, ChunkingOutcome, ChunkingStats, SemanticChunk,
};
use super::{assembly, breakpoints, segmenter};

/// Response of one chunking call: chunks plus observability data.
#[derive(Clone, Debug)]
pub struct ChunkResponse {
    pub outcome: ChunkingOutcome,
    pub telemetry: ChunkTelemetry,
}

pub struct SemanticChunkingService {
    provider: Arc<dyn EmbeddingProvider>,
    config: ChunkingConfig,
    cache: EmbeddingCache,
}

impl SemanticChunkingService {
    pub fn builder() -> SemanticChunkingServiceBuilder {
        SemanticChunkingServiceBuilder::default()
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Splits one text into semantically-coherent chunks.
    ///
    /// Deterministic for a fixed text, provider, and configuration. Zero or
    /// one sentence short-circuits without touching the provider.
    pub async fn chunk_text(&self, text: &str) -> Result<ChunkResponse, ChunkingError> {
        self.config.validate()?;
        let started = Instant::now();
        let hits_before = self.cache.hits();
        let misses_before = self.cache.misses();

        let sentences = segmenter::split_sentences(text);
        let total_sentences = sentences.len();

        let assembled = if sentences.len() <= 1 {
            sentences
                .iter()
                .map(|sentence| (sentence.clone(), 1))
                .collect()
        } else {
            let window = self.config.smoothing_window.unwrap_or(0);
            let inputs = segmenter::smoothing_windows(&sentences, window);
            let embeddings = self.embed_with_cache(&inputs).await?;
            let distances = breakpoints::distance_sequence(&embeddings);
            let selected = breakpoints::breakpoint_threshold(&distances, &self.config.strategy)
                .map(|threshold| breakpoints::select_breakpoints(&distances, threshold))
                .unwrap_or_default();
            tracing::debug!(
                sentences = sentences.len(),
                breakpoints = selected.len(),
                strategy = self.config.strategy.label(),
                "semantic boundaries selected"
            );
            assembly::assemble(&sentences, &selected, self.config.min_sentences_per_chunk)
        };

        let (assembled, fallback_used) = match self.config.max_chunk_chars {
            Some(max) if self.config.fallback_to_lexical => {
                assembly::enforce_max_chars(assembled, max)?
            }
            _ => (assembled, false),
        };

        let chunks = assembly::into_chunks(assembled);
        let stats = compute_stats(total_sentences, &chunks);
        let telemetry = ChunkTelemetry {
            embedder: self.provider.name().to_string(),
            strategy: self.config.strategy.label().to_string(),
            smoothing_window: self.config.smoothing_window,
            duration_ms: started.elapsed().as_millis() as u64,
            cache_hits: self.cache.hits() - hits_before,
            cache_misses: self.cache.misses() - misses_before,
            fallback_used,
            chunk_count: chunks.len(),
            average_chars: stats.average_chars,
        };

        Ok(ChunkResponse {
            outcome: ChunkingOutcome { chunks, stats },
            telemetry,
        })
    }

    /// Splits every document, inheriting metadata and assigning zero-based
    /// per-document chunk indices.
    pub async fn split_documents(&self, documents: &[Document]) -> Result<Vec<Chunk>, ChunkingError> {
        let mut chunks = Vec::new();
        for document in documents {
            let response = self.chunk_text(&document.content).await?;
            chunks.extend(response.outcome.chunks.into_iter().enumerate().map(
                |(index, chunk)| Chunk {
                    content: chunk.content,
                    metadata: document.metadata.clone(),
                    chunk_index: index,
                },
            ));
        }
        Ok(chunks)
    }

    async fn embed_with_cache(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChunkingError> {
        let name = self.provider.name().to_string();
        let mut vectors: Vec<Option<Vec<f32>>> = inputs
            .iter()
            .map(|input| self.cache.get(&name, input))
            .collect();

        let missing: Vec<usize> = (0..inputs.len()).filter(|&i| vectors[i].is_none()).collect();
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| inputs[i].clone()).collect();
            let batch_size = self.provider.max_batch_size().max(1);
            let mut fresh = Vec::with_capacity(texts.len());
            for slice in texts.chunks(batch_size) {
                let embedded = self
                    .provider
                    .embed_batch(slice)
                    .await
                    .map_err(|err| ChunkingError::Embedding(err.to_string()))?;
                if embedded.len() != slice.len() {
                    return Err(ChunkingError::Embedding(format!(
                        "expected {} vectors, got {}",
                        slice.len(),
                        embedded.len()
                    )));
                }
                fresh.extend(embedded);
            }
            for (&index, vector) in missing.iter().zip(fresh) {
                self.cache.insert(&name, &inputs[index], vector.clone());
                vectors[index] = Some(vector);
            }
        }

        Ok(vectors.into_iter().flatten().collect())
    }
}

fn compute_stats(total_sentences: usize, chunks: &[SemanticChunk]) -> ChunkingStats {
    let average_chars = if chunks.is_empty() {
        0.0
    } else {
        chunks.iter().map(|c| c.char_count).sum::<usize>() as f32 / chunks.len() as f32
    };
    ChunkingStats {
        total_sentences,
        total_chunks: chunks.len(),
        average_chars,
    }
}

#[derive(Default)]
pub struct SemanticChunkingServiceBuilder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    config: Option<ChunkingConfig>,
}

impl SemanticChunkingServiceBuilder {
    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ChunkingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the service.
    ///
    /// # Panics
    ///
    /// Panics if no embedding provider was supplied; use
    /// [`try_build`](Self::try_build) for a fallible variant.
    pub fn build(self) -> SemanticChunkingService {
        self.try_build()
            .expect("SemanticChunkingServiceBuilder requires an embedding provider")
    }

    pub fn try_build(self) -> Option<SemanticChunkingService> {
        Some(SemanticChunkingService {
            provider: self.provider?,
            config: self.config.unwrap_or_default(),
            cache: EmbeddingCache::new(),
        })
    }
}
