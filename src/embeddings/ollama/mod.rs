
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::embeddings::chunking::Chunk;
use crate::ollama::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_TIMEOUT_SECONDS, build_agent, request_with_retry};
use crate::{LessonError, Result};

/// Dimension of nomic-embed-text, the default embedding model
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

/// Client for the Ollama embedding endpoint.
///
/// Embedding is deterministic for a fixed model version, so re-embedding
/// the same text always reproduces the same vector.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: Url,
    model: String,
    batch_size: u32,
    dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

/// A chunk paired with its embedding vector, ready for upsert.
///
/// The id is derived from the namespace and the chunk's ordinal position,
/// so re-ingesting a source overwrites instead of duplicating.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama
            .ollama_url()
            .map_err(|e| LessonError::Config(e.to_string()))?;

        Ok(Self {
            base_url,
            model: config.ollama.embedding_model.clone(),
            batch_size: config.ollama.batch_size,
            dimension: config.ollama.embedding_dimension as usize,
            agent: build_agent(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// The fixed vector dimension this embedder enforces
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Confirm the server answers and the configured model is installed.
    ///
    /// One round trip: the tag listing doubles as the reachability probe.
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let models = self.list_models()?;

        if !models.iter().any(|m| m.name == self.model) {
            let installed: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            return Err(LessonError::Embedding(format!(
                "model '{}' is not installed on {} (installed: {:?})",
                self.model, self.base_url, installed
            )));
        }

        info!(
            "Ollama at {} is up and serves {}",
            self.base_url, self.model
        );
        Ok(())
    }

    /// List the models installed on the server
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .map_err(|e| LessonError::Embedding(format!("failed to build models URL: {}", e)))?;

        let body = request_with_retry(self.retry_attempts, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .map_err(|reason| LessonError::Embedding(format!("failed to fetch models: {}", reason)))?;

        let listing: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| LessonError::Embedding(format!("failed to parse models response: {}", e)))?;

        debug!("Server reports {} installed models", listing.models.len());
        Ok(listing.models)
    }

    /// Embed a batch of texts, preserving order.
    ///
    /// Empty input yields an empty result. Every returned vector is checked
    /// against the configured dimension; a mismatch is fatal.
    #[inline]
    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            vectors.extend(self.embed_single_batch(batch)?);
        }

        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }

    /// Embed chunks and attach deterministic ids scoped to `namespace`
    #[inline]
    pub fn embed_chunks(&self, namespace: &str, chunks: &[Chunk]) -> Result<Vec<EmbeddedChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} chunks for namespace {}",
            chunks.len(),
            namespace
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_texts(&texts)?;

        let embedded = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk {
                id: format!("{}:{}", namespace, chunk.index),
                text: chunk.text.clone(),
                vector,
            })
            .collect();

        Ok(embedded)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/api/embed")
            .map_err(|e| LessonError::Embedding(format!("failed to build embed URL: {}", e)))?;

        let payload = serde_json::to_string(&EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        })
        .map_err(|e| LessonError::Embedding(format!("failed to serialize request: {}", e)))?;

        let body = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&payload)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .map_err(|reason| {
            LessonError::Embedding(format!(
                "failed to embed batch of {}: {}",
                texts.len(),
                reason
            ))
        })?;

        let response: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| LessonError::Embedding(format!("failed to parse embed response: {}", e)))?;

        if response.embeddings.len() != texts.len() {
            return Err(LessonError::Embedding(format!(
                "sent {} texts but received {} vectors",
                texts.len(),
                response.embeddings.len()
            )));
        }

        // One fixed dimension across the whole index, enforced here at the
        // model boundary
        if let Some(bad) = response
            .embeddings
            .iter()
            .find(|v| v.len() != self.dimension)
        {
            return Err(LessonError::Embedding(format!(
                "model returned dimension {} but index expects {}",
                bad.len(),
                self.dimension
            )));
        }

        Ok(response.embeddings)
    }
}
