//! ```text
//! Source directory ──► ingestion::loader ──► Vec<Document>
//!                                              │
//!                        ┌─────────────────────┴────────────────────┐
//!                        ▼                                          ▼
//!          chunking::lexical (fixed windows)        chunking::service (semantic)
//!                        │                                          │
//!                        │                  segmenter ─► embeddings ─► breakpoints ─► assembly
//!                        └─────────────────────┬────────────────────┘
//!                                              ▼
//!                             ingestion::batch (embed, all-or-nothing)
//!                                              │
//!                                              ▼
//!            stores::VectorStore ── SqliteVectorStore / InMemoryVectorStore
//!                                              │
//!                                              ▼
//!                          similarity queries & RAG applications
//! ```

pub mod chunking;
pub mod embeddings;
pub mod ingestion;
pub mod stores;
pub mod types;

pub use chunking::config::{BreakpointStrategy, ChunkingConfig};
pub use chunking::lexical::LexicalSplitter;
pub use chunking::service::{ChunkResponse, SemanticChunkingService};
pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use ingestion::loader::DirectoryLoader;
pub use ingestion::pipeline::{
    IngestReport, IngestionPipeline, PipelineConfig, PipelineFailure, SplitterKind,
};
pub use ingestion::resume::ResumeTracker;
pub use stores::{
    ChunkRecord, DistanceMetric, InMemoryVectorStore, ScoredChunk, SqliteVectorStore, VectorStore,
};
pub use types::{Chunk, Document, DocumentMetadata, IngestError};
