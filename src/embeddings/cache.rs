//! In-process cache for computed embeddings.
//!
//! Sentence windows repeat across ingestion runs of the same corpus, so the
//! chunking service keeps vectors keyed by a hash of (provider name, text).
//! Hit and miss counts feed chunking telemetry.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<u64, Vec<f32>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(provider: &str, text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        provider.hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Looks up a cached vector, counting the outcome.
    pub fn get(&self, provider: &str, text: &str) -> Option<Vec<f32>> {
        let found = self.entries.read().get(&Self::key(provider, text)).cloned();
        match found {
            Some(vector) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(vector)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, provider: &str, text: &str, vector: Vec<f32>) {
        self.entries
            .write()
            .insert(Self::key(provider, text), vector);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = EmbeddingCache::new();
        assert!(cache.get("mock", "sentence").is_none());
        assert_eq!(cache.misses(), 1);

        cache.insert("mock", "sentence", vec![0.1, 0.2]);
        assert_eq!(cache.get("mock", "sentence"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn keys_are_provider_scoped() {
        let cache = EmbeddingCache::new();
        cache.insert("model-a", "text", vec![1.0]);
        assert!(cache.get("model-b", "text").is_none());
    }
}
