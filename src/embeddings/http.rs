//! HTTP embedding provider.
//!
//! Speaks the widely-implemented `POST /embeddings` JSON shape
//! (`{"model": .., "input": [..]}` in, `{"data": [{"embedding": [..]}]}`
//! out), so it works against OpenAI-compatible servers and local gateways
//! alike. Transport failures and 5xx responses are retried with exponential
//! backoff before the run is aborted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::EmbeddingProvider;
use crate::types::IngestError;

const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
    dimensions: usize,
    max_batch_size: usize,
    max_retries: usize,
    backoff: Duration,
}

impl HttpEmbeddingProvider {
    /// Creates a provider targeting `endpoint` (the full `/embeddings` URL).
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, IngestError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| IngestError::Embedding(format!("invalid endpoint: {err}")))?;
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|err| IngestError::Embedding(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            dimensions,
            max_batch_size: 64,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: DEFAULT_BACKOFF,
        })
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: usize, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = backoff;
        self
    }

    async fn request_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RequestFailure> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| RequestFailure::Retryable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RequestFailure::Retryable(format!(
                "server returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(RequestFailure::Fatal(format!("server returned {status}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RequestFailure::Fatal(format!("malformed response: {err}")))?;

        Ok(parsed.data.into_iter().map(|row| row.embedding).collect())
    }
}

enum RequestFailure {
    Retryable(String),
    Fatal(String),
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        let vectors = loop {
            match self.request_once(texts).await {
                Ok(vectors) => break vectors,
                Err(RequestFailure::Fatal(reason)) => {
                    return Err(IngestError::Embedding(reason));
                }
                Err(RequestFailure::Retryable(reason)) => {
                    if attempt >= self.max_retries {
                        return Err(IngestError::Embedding(format!(
                            "{reason} (after {} attempts)",
                            attempt + 1
                        )));
                    }
                    let delay = self.backoff * 2u32.saturating_pow(attempt as u32);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "embedding request failed, retrying: {reason}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        if vectors.len() != texts.len() {
            return Err(IngestError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(IngestError::Embedding(format!(
                    "expected dimensionality {}, got {}",
                    self.dimensions,
                    vector.len()
                )));
            }
        }

        Ok(vectors)
    }
}
