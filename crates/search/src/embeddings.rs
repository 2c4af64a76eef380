//! Text embedders
//!
//! The embedding model is an external collaborator: `encode(text)`
//! returns a fixed-dimension vector. The hashing embedder is the
//! deterministic local default; the remote embedder calls an
//! Ollama-compatible endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SearchError;

/// Embedder configuration
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// Embedding dimension
    pub dimension: usize,
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Remote endpoint (Ollama-compatible)
    pub endpoint: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            normalize: true,
            endpoint: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Text to fixed-dimension vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, SearchError>;

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}

/// Deterministic char-hash embedder, no model required
pub struct HashingEmbedder {
    config: EmbedderConfig,
}

impl HashingEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        Self { config }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.config.dimension];

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % self.config.dimension;
            embedding[idx] += 1.0;
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Remote embedder over an Ollama-compatible `/api/embeddings` endpoint
pub struct RemoteEmbedder {
    client: Client,
    config: EmbedderConfig,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(model: impl Into<String>, config: EmbedderConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Model(e.to_string()))?;

        Ok(Self {
            client,
            config,
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.endpoint))
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Embedding(format!(
                "embedding endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedder_is_normalized() {
        let embedder = HashingEmbedder::new(EmbedderConfig::default());
        let embedding = embedder.encode("Hello Tbilisi").await.unwrap();

        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(EmbedderConfig::default());
        let a = embedder.encode("Светицховели").await.unwrap();
        let b = embedder.encode("Светицховели").await.unwrap();
        assert_eq!(a, b);
    }
}
