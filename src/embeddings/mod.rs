//! Embedding provider abstraction.
//!
//! Everything downstream of chunking talks to embeddings through
//! [`EmbeddingProvider`], so a local model, a remote API, or the
//! deterministic [`MockEmbeddingProvider`] can be swapped in without
//! touching pipeline logic.

pub mod cache;
pub mod http;

use async_trait::async_trait;

use crate::types::IngestError;

pub use cache::EmbeddingCache;
pub use http::HttpEmbeddingProvider;

/// Maps text to fixed-length vectors.
///
/// Implementations must be deterministic for a fixed [`name`](Self::name):
/// the same input always yields the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the underlying model; part of cache keys.
    fn name(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Largest number of inputs accepted per `embed_batch` call.
    fn max_batch_size(&self) -> usize {
        64
    }

    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| IngestError::Embedding("provider returned no vector".to_string()))
    }
}

/// Cosine similarity between two vectors; 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Deterministic provider for tests and offline runs.
///
/// Vectors are derived from a hash of the input text, so identical inputs
/// always embed identically and distinct inputs almost always differ.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();

        let inputs = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second, "mock embeddings should be deterministic");
        assert_eq!(first[0], first[2], "identical text, identical embedding");
        assert_ne!(first[0], first[1], "different text, different embedding");
    }

    #[tokio::test]
    async fn mock_respects_dimensions() {
        let provider = MockEmbeddingProvider::with_dimensions(16);
        let vector = provider.embed("sized").await.unwrap();
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, -0.25, 1.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
