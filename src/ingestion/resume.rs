//! Resume helpers for long-running ingestion jobs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::types::IngestError;

/// Tracks which sources have already been ingested so interrupted corpus
/// runs can skip completed documents on the next attempt.
///
/// A source should only be marked after its chunks are durably persisted;
/// replaying an unmarked source is safe because upserts replace by id.
#[derive(Clone, Debug)]
pub struct ResumeTracker {
    path: PathBuf,
    state: Arc<Mutex<HashSet<String>>>,
}

impl ResumeTracker {
    /// Creates a tracker that persists state to the provided path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Path where the tracker persists processed sources.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously persisted state, if any.
    pub async fn load(&self) -> Result<(), IngestError> {
        if !self.path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(&self.path).await?;
        let sources: Vec<String> =
            serde_json::from_str(&data).map_err(|err| IngestError::Storage(err.to_string()))?;
        let mut guard = self.state.lock().await;
        guard.clear();
        guard.extend(sources);
        Ok(())
    }

    /// Returns `true` if the given source has already been processed.
    pub async fn contains(&self, source: &str) -> bool {
        let guard = self.state.lock().await;
        guard.contains(source)
    }

    /// Marks a source as processed and persists the updated state.
    pub async fn mark_processed(&self, source: &str) -> Result<(), IngestError> {
        let mut guard = self.state.lock().await;
        let inserted = guard.insert(source.to_string());
        if !inserted && self.path.exists() {
            return Ok(());
        }
        let sources: Vec<String> = guard.iter().cloned().collect();
        drop(guard);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let serialized = serde_json::to_string(&sources)
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        fs::write(&self.path, serialized).await?;
        Ok(())
    }
}
