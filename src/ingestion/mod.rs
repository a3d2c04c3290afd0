//! Corpus ingestion: loading, batching, orchestration, and resume state.
//!
//! * [`loader`] — directory walking and per-format document loaders.
//! * [`batch`] — chunk batches with embeddings, computed all-or-nothing.
//! * [`pipeline`] — the load → split → embed → persist orchestrator.
//! * [`resume`] — state tracking for resumable ingestion jobs.

pub mod batch;
pub mod loader;
pub mod pipeline;
pub mod resume;

pub use batch::{ChunkBatch, embed_chunks};
pub use loader::{DirectoryLoader, DocumentLoader, TextLoader};
pub use pipeline::{
    IngestReport, IngestionPipeline, PipelineConfig, PipelineFailure, PipelineStage, SplitterKind,
};
pub use resume::ResumeTracker;

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
