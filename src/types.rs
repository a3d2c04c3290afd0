//! Core document types and the crate-wide error taxonomy.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata attached to every loaded document and inherited by its chunks.
///
/// `source` is always the originating file path so any chunk can be traced
/// back to the file it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: content_type.into(),
            extra: HashMap::new(),
        }
    }
}

/// A source document as produced by a loader. Immutable once loaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A bounded contiguous piece of a document, carrying the parent metadata
/// and a zero-based position within the parent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}

/// Errors surfaced by the ingestion pipeline and its collaborators.
///
/// Configuration problems (`SplitConfig`) are detected eagerly, before any
/// I/O. Loader and store failures abort the whole run; there is no silent
/// partial-success mode.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The source directory does not exist (or is not a directory).
    #[error("source directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The source directory exists but contains no matching documents.
    #[error("no documents matching '{pattern}' under {}", .root.display())]
    EmptyCorpus { root: PathBuf, pattern: String },

    /// Invalid chunking or pipeline configuration.
    #[error("invalid split configuration: {0}")]
    SplitConfig(String),

    /// The embedding provider failed or returned the wrong dimensionality.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector store rejected a write.
    #[error("vector store rejected write: {0}")]
    StoreWrite(String),

    /// The vector store could not be opened or read.
    #[error("storage error: {0}")]
    Storage(String),

    /// A source file could not be interpreted as a document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
