//! End-to-end pipeline tests with mock embedding providers.
//!
//! Everything here runs against deterministic embeddings and the in-memory
//! or SQLite store, suitable for CI.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::tempdir;

use chunksmith::ingestion::pipeline::PipelineStage;
use chunksmith::{
    ChunkRecord, DistanceMetric, EmbeddingProvider, InMemoryVectorStore, IngestError,
    IngestionPipeline, MockEmbeddingProvider, PipelineConfig, ScoredChunk, SplitterKind,
    SqliteVectorStore, VectorStore,
};

/// Store wrapper that counts upsert calls, so tests can assert the store
/// was never touched after an upstream failure.
struct RecordingStore {
    inner: InMemoryVectorStore,
    upsert_calls: AtomicUsize,
}

impl RecordingStore {
    fn new(dimensions: usize) -> Self {
        Self {
            inner: InMemoryVectorStore::new(dimensions, DistanceMetric::Cosine),
            upsert_calls: AtomicUsize::new(0),
        }
    }

    fn upserts(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn upsert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), IngestError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_chunks(chunks).await
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IngestError> {
        self.inner.search_similar(query_embedding, top_k).await
    }

    async fn chunks_by_source(&self, source: &str) -> Result<Vec<ChunkRecord>, IngestError> {
        self.inner.chunks_by_source(source).await
    }

    async fn chunk_by_id(&self, id: &str) -> Result<Option<ChunkRecord>, IngestError> {
        self.inner.chunk_by_id(id).await
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize, IngestError> {
        self.inner.delete_by_source(source).await
    }

    async fn count(&self) -> Result<usize, IngestError> {
        self.inner.count().await
    }

    fn metric(&self) -> DistanceMetric {
        self.inner.metric()
    }
}

/// Provider that fails partway through a corpus, like a flaky remote API.
struct FailAfterProvider {
    succeed_calls: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FailAfterProvider {
    fn name(&self) -> &str {
        "fail-after"
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn max_batch_size(&self) -> usize {
        1
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.succeed_calls {
            return Err(IngestError::Embedding("provider went away".to_string()));
        }
        Ok(texts.iter().map(|_| vec![0.5; 8]).collect())
    }
}

fn write_corpus(dir: &std::path::Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        std::fs::write(dir.join(name), content).unwrap();
    }
}

#[tokio::test]
async fn lexical_pipeline_ingests_a_corpus() {
    let corpus = tempdir().unwrap();
    write_corpus(
        corpus.path(),
        &[
            ("a.txt", "Alpha document body with enough words to matter."),
            ("b.txt", "Beta document body, also short."),
        ],
    );

    let store = Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine));
    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig::default())
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let report = pipeline.run(corpus.path()).await.unwrap();

    assert_eq!(report.documents_loaded, 2);
    assert_eq!(report.chunks_produced, 2, "short docs are one chunk each");
    assert_eq!(report.chunks_persisted, 2);
    assert_eq!(report.collection_size, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    let provider = MockEmbeddingProvider::new();
    let query = provider.embed("Alpha document").await.unwrap();
    let hits = store.search_similar(&query, 1).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn unbroken_document_splits_into_expected_chunks() {
    let corpus = tempdir().unwrap();
    let content = "x".repeat(2500);
    write_corpus(corpus.path(), &[("a.txt", &content)]);

    let store = Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine));
    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig {
            chunk_size: 1000,
            chunk_overlap: 0,
            ..Default::default()
        })
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let report = pipeline.run(corpus.path()).await.unwrap();
    assert_eq!(report.chunks_produced, 3);

    let source = corpus.path().join("a.txt").display().to_string();
    let mut chunks = store.chunks_by_source(&source).await.unwrap();
    chunks.sort_by_key(|c| c.chunk_index);
    let lengths: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
    assert_eq!(lengths, vec![1000, 1000, 500]);
    assert_eq!(
        chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn empty_corpus_aborts_before_any_store_call() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path(), &[("notes.md", "wrong extension")]);

    let store = Arc::new(RecordingStore::new(8));
    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig::default())
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let failure = pipeline.run(corpus.path()).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Load);
    assert!(matches!(failure.error, IngestError::EmptyCorpus { .. }));
    assert_eq!(store.upserts(), 0, "store must not be touched");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn provider_failure_mid_batch_persists_nothing() {
    let corpus = tempdir().unwrap();
    // Five chunks; the provider dies on the third embed call.
    let content = "x".repeat(5000);
    write_corpus(corpus.path(), &[("a.txt", &content)]);

    let store = Arc::new(RecordingStore::new(8));
    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig {
            chunk_size: 1000,
            chunk_overlap: 0,
            ..Default::default()
        })
        .embedding_provider(Arc::new(FailAfterProvider {
            succeed_calls: 2,
            calls: AtomicUsize::new(0),
        }))
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let failure = pipeline.run(corpus.path()).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Embed);
    assert_eq!(failure.documents_loaded, 1);
    assert_eq!(failure.chunks_produced, 5);
    assert_eq!(store.upserts(), 0);
    assert_eq!(
        store.count().await.unwrap(),
        0,
        "no chunk from the failed batch may be visible"
    );
}

#[tokio::test]
async fn semantic_pipeline_ingests_with_mock_embeddings() {
    let corpus = tempdir().unwrap();
    write_corpus(
        corpus.path(),
        &[(
            "report.txt",
            "Revenue reached a record high this quarter. Analysts were surprised by the margin. \
             The factory line suffered repeated stoppages. Suppliers missed several deadlines. \
             Customers nevertheless kept ordering. Satisfaction scores stayed strong.",
        )],
    );

    let store = Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine));
    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig {
            splitter: SplitterKind::Semantic,
            ..Default::default()
        })
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let report = pipeline.run(corpus.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 1);
    assert!(report.chunks_produced >= 1);
    assert_eq!(report.collection_size, report.chunks_persisted);

    let source = corpus.path().join("report.txt").display().to_string();
    let chunks = store.chunks_by_source(&source).await.unwrap();
    let mut indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());

    // Rerunning the same corpus with the same configuration reproduces the
    // same boundaries and ids, so the collection does not grow.
    let report_two = pipeline.run(corpus.path()).await.unwrap();
    assert_eq!(report_two.chunks_produced, report.chunks_produced);
    assert_eq!(report_two.collection_size, report.collection_size);
}

#[tokio::test]
async fn sqlite_pipeline_roundtrips_to_disk() {
    let corpus = tempdir().unwrap();
    write_corpus(
        corpus.path(),
        &[
            ("one.txt", "The first document talks about databases."),
            ("two.txt", "The second document talks about embeddings."),
        ],
    );

    let db_dir = tempdir().unwrap();
    let provider = Arc::new(MockEmbeddingProvider::new());
    let store = Arc::new(
        SqliteVectorStore::open(
            db_dir.path().join("chunks.sqlite"),
            provider.dimensions(),
            DistanceMetric::Cosine,
        )
        .await
        .unwrap(),
    );

    let pipeline = IngestionPipeline::builder()
        .config(PipelineConfig::default())
        .embedding_provider(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>)
        .store(Arc::clone(&store) as Arc<dyn VectorStore>)
        .build()
        .unwrap();

    let report = pipeline.run(corpus.path()).await.unwrap();
    assert_eq!(report.documents_loaded, 2);
    assert_eq!(report.collection_size, 2);

    let query = provider.embed("databases").await.unwrap();
    let hits = store.search_similar(&query, 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].distance <= hits[1].distance);
}

#[tokio::test]
async fn invalid_configuration_fails_before_io() {
    let result = IngestionPipeline::builder()
        .config(PipelineConfig {
            chunk_size: 0,
            ..Default::default()
        })
        .embedding_provider(Arc::new(MockEmbeddingProvider::new()))
        .store(Arc::new(InMemoryVectorStore::new(8, DistanceMetric::Cosine)))
        .build();
    assert!(matches!(result, Err(IngestError::SplitConfig(_))));
}
