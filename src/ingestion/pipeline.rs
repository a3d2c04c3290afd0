//! The ingestion pipeline: load → split → embed → persist.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chunking::config::ChunkingConfig;
use crate::chunking::lexical::LexicalSplitter;
use crate::chunking::service::SemanticChunkingService;
use crate::embeddings::EmbeddingProvider;
use crate::stores::{DistanceMetric, VectorStore};
use crate::types::{Chunk, IngestError};

use super::batch;
use super::loader::DirectoryLoader;

/// Which splitter the pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitterKind {
    Lexical,
    Semantic,
}

/// Every recognized pipeline option, with defaults matching the common
/// ingestion setup. Nothing is read from the process environment; this
/// struct is the whole configuration surface.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// File-name glob selecting corpus files.
    pub glob: String,
    /// Fixed-size or semantic splitting.
    pub splitter: SplitterKind,
    /// Window size for the lexical splitter, in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive lexical windows, in characters.
    pub chunk_overlap: usize,
    /// Semantic splitter tunables.
    pub chunking: ChunkingConfig,
    /// Distance metric the collection is configured with.
    pub metric: DistanceMetric,
    /// Where the durable collection lives.
    pub collection_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            glob: "*.txt".to_string(),
            splitter: SplitterKind::Lexical,
            chunk_size: 1000,
            chunk_overlap: 0,
            chunking: ChunkingConfig::default(),
            metric: DistanceMetric::Cosine,
            collection_path: PathBuf::from("chunks.sqlite"),
        }
    }
}

impl PipelineConfig {
    /// Checks every configuration value; runs before any I/O.
    pub fn validate(&self) -> Result<(), IngestError> {
        LexicalSplitter::new(self.chunk_size, self.chunk_overlap)?;
        self.chunking.validate().map_err(IngestError::from)?;
        glob::Pattern::new(&self.glob)
            .map_err(|err| IngestError::SplitConfig(format!("invalid glob '{}': {err}", self.glob)))?;
        Ok(())
    }
}

/// The pipeline stage a failure occurred in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Load,
    Split,
    Embed,
    Persist,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PipelineStage::Load => "load",
            PipelineStage::Split => "split",
            PipelineStage::Embed => "embed",
            PipelineStage::Persist => "persist",
        };
        f.write_str(label)
    }
}

/// A failed run: which stage broke and how far the run got first.
#[derive(Debug, thiserror::Error)]
#[error(
    "ingestion aborted during {stage}: {error} \
     ({documents_loaded} documents loaded, {chunks_produced} chunks produced)"
)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub documents_loaded: usize,
    pub chunks_produced: usize,
    #[source]
    pub error: IngestError,
}

/// Summary of a completed run.
#[derive(Clone, Debug)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub chunks_produced: usize,
    pub chunks_persisted: usize,
    pub collection_size: usize,
    pub elapsed: Duration,
}

/// Sequences loader → splitter → embedder → store for one corpus.
pub struct IngestionPipeline {
    config: PipelineConfig,
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    lexical: LexicalSplitter,
    semantic: SemanticChunkingService,
}

impl IngestionPipeline {
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline over the corpus under `root`.
    ///
    /// Any stage failure aborts the stages after it; nothing is written to
    /// the store unless every chunk embedded successfully.
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<IngestReport, PipelineFailure> {
        let root = root.as_ref();
        let started = Instant::now();
        let fail = |stage, documents_loaded, chunks_produced, error| PipelineFailure {
            stage,
            documents_loaded,
            chunks_produced,
            error,
        };

        let loader = DirectoryLoader::new(root, &self.config.glob)
            .map_err(|err| fail(PipelineStage::Load, 0, 0, err))?;
        let documents = loader
            .load()
            .await
            .map_err(|err| fail(PipelineStage::Load, 0, 0, err))?;
        let documents_loaded = documents.len();
        tracing::info!(documents = documents_loaded, root = %root.display(), "corpus loaded");

        let chunks: Vec<Chunk> = match self.config.splitter {
            SplitterKind::Lexical => self.lexical.split_documents(&documents),
            SplitterKind::Semantic => self
                .semantic
                .split_documents(&documents)
                .await
                .map_err(|err| fail(PipelineStage::Split, documents_loaded, 0, err.into()))?,
        };
        let chunks_produced = chunks.len();
        tracing::info!(chunks = chunks_produced, "documents split");

        let batch = batch::embed_chunks(self.provider.as_ref(), chunks)
            .await
            .map_err(|err| fail(PipelineStage::Embed, documents_loaded, chunks_produced, err))?;
        tracing::info!(
            chunks = batch.len(),
            embedder = self.provider.name(),
            "embeddings computed"
        );

        let chunks_persisted = batch.len();
        self.store
            .upsert_chunks(batch.into_records())
            .await
            .map_err(|err| {
                fail(
                    PipelineStage::Persist,
                    documents_loaded,
                    chunks_produced,
                    err,
                )
            })?;
        let collection_size = self.store.count().await.map_err(|err| {
            fail(
                PipelineStage::Persist,
                documents_loaded,
                chunks_produced,
                err,
            )
        })?;

        let report = IngestReport {
            documents_loaded,
            chunks_produced,
            chunks_persisted,
            collection_size,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            documents = report.documents_loaded,
            chunks = report.chunks_persisted,
            collection_size = report.collection_size,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "ingestion complete"
        );
        Ok(report)
    }
}

#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<PipelineConfig>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
}

impl IngestionPipelineBuilder {
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the configuration and assembles the pipeline.
    ///
    /// All `SplitConfig` checks happen here, before any file or network
    /// I/O.
    pub fn build(self) -> Result<IngestionPipeline, IngestError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let provider = self
            .provider
            .ok_or_else(|| IngestError::SplitConfig("an embedding provider is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| IngestError::SplitConfig("a vector store is required".into()))?;

        let lexical = LexicalSplitter::new(config.chunk_size, config.chunk_overlap)?;
        let semantic = SemanticChunkingService::builder()
            .with_embedding_provider(Arc::clone(&provider))
            .with_config(config.chunking.clone())
            .build();

        Ok(IngestionPipeline {
            config,
            provider,
            store,
            lexical,
            semantic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::InMemoryVectorStore;

    fn test_pipeline(config: PipelineConfig) -> IngestionPipeline {
        IngestionPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
            .store(Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine)))
            .build()
            .unwrap()
    }

    #[test]
    fn build_rejects_bad_overlap_before_any_io() {
        let config = PipelineConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        let result = IngestionPipeline::builder()
            .config(config)
            .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
            .store(Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine)))
            .build();
        assert!(matches!(result, Err(IngestError::SplitConfig(_))));
    }

    #[test]
    fn build_requires_provider_and_store() {
        let result = IngestionPipeline::builder()
            .config(PipelineConfig::default())
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_root_fails_in_load_stage() {
        let pipeline = test_pipeline(PipelineConfig::default());
        let failure = pipeline.run("/no/such/corpus").await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Load);
        assert_eq!(failure.documents_loaded, 0);
        assert!(matches!(failure.error, IngestError::NotFound(_)));
    }
}
