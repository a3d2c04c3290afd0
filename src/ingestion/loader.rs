//! Document loaders.
//!
//! [`DirectoryLoader`] walks one directory, filters file names through a
//! glob, and hands each match to the format loader for its extension. It
//! only ever reads; source files are never touched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::Pattern;
use tokio::fs;

use crate::types::{Document, DocumentMetadata, IngestError};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Loads one source file into documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, IngestError>;

    fn supported_extensions(&self) -> &[&str];
}

/// Plain-text loader for `.txt`, `.md` and `.markdown` files.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let meta = fs::metadata(path).await?;
        if meta.len() > self.max_file_size {
            return Err(IngestError::InvalidDocument(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                meta.len(),
                self.max_file_size
            )));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content_type = match extension {
            "md" | "markdown" => "text/markdown",
            _ => "text/plain",
        };

        let content = fs::read_to_string(path).await.map_err(|err| {
            IngestError::InvalidDocument(format!("{} is not valid UTF-8: {err}", path.display()))
        })?;

        Ok(vec![Document {
            content,
            metadata: DocumentMetadata::new(path.display().to_string(), content_type),
        }])
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}

/// PDF loader; extracts the text layer only (no layout analysis).
#[cfg(feature = "pdf")]
pub struct PdfLoader {
    pub max_file_size: u64,
}

#[cfg(feature = "pdf")]
impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[cfg(feature = "pdf")]
#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let meta = fs::metadata(path).await?;
        if meta.len() > self.max_file_size {
            return Err(IngestError::InvalidDocument(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                meta.len(),
                self.max_file_size
            )));
        }

        let source = path.display().to_string();
        let owned = path.to_path_buf();
        // pdf-extract is synchronous and CPU-bound.
        let content = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&owned)
                .map_err(|err| IngestError::InvalidDocument(format!("pdf extraction failed: {err}")))
        })
        .await
        .map_err(|err| IngestError::InvalidDocument(err.to_string()))??;

        Ok(vec![Document {
            content,
            metadata: DocumentMetadata::new(source, "application/pdf"),
        }])
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Loads every file in a directory whose name matches a glob pattern.
pub struct DirectoryLoader {
    root: PathBuf,
    pattern: Pattern,
    pattern_text: String,
    max_file_size: u64,
}

impl DirectoryLoader {
    /// Creates a loader for `root` with a file-name glob such as `*.txt`.
    ///
    /// The pattern is validated eagerly; a malformed glob is a
    /// configuration error.
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self, IngestError> {
        let compiled = Pattern::new(pattern)
            .map_err(|err| IngestError::SplitConfig(format!("invalid glob '{pattern}': {err}")))?;
        Ok(Self {
            root: root.into(),
            pattern: compiled,
            pattern_text: pattern.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        })
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the corpus.
    ///
    /// Fails with [`IngestError::NotFound`] when the directory is missing
    /// and [`IngestError::EmptyCorpus`] when nothing matches the glob —
    /// distinct conditions, both fatal to an ingestion run.
    pub async fn load(&self) -> Result<Vec<Document>, IngestError> {
        let is_dir = fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(IngestError::NotFound(self.root.clone()));
        }

        let mut matches = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.pattern.matches(name) {
                matches.push(path);
            }
        }
        // Directory iteration order is platform-dependent; sort for a
        // deterministic corpus sequence.
        matches.sort();

        if matches.is_empty() {
            return Err(IngestError::EmptyCorpus {
                root: self.root.clone(),
                pattern: self.pattern_text.clone(),
            });
        }

        let mut documents = Vec::with_capacity(matches.len());
        for path in &matches {
            let loaded = self.load_one(path).await?;
            documents.extend(loaded);
        }
        tracing::debug!(
            documents = documents.len(),
            root = %self.root.display(),
            pattern = %self.pattern_text,
            "corpus loaded"
        );
        Ok(documents)
    }

    async fn load_one(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            #[cfg(feature = "pdf")]
            "pdf" => {
                let loader = PdfLoader {
                    max_file_size: self.max_file_size,
                };
                loader.load(path).await
            }
            #[cfg(not(feature = "pdf"))]
            "pdf" => Err(IngestError::InvalidDocument(format!(
                "{} requires the 'pdf' feature",
                path.display()
            ))),
            _ => {
                let loader = TextLoader {
                    max_file_size: self.max_file_size,
                };
                loader.load(path).await
            }
        }
    }
}
