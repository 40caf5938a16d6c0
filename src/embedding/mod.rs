//! Embedding client abstraction and provider adapters.
//!
//! Chunk text and query text go through the same client so that both live in one vector
//! space. Clients are built once at startup and shared read-only across requests.

mod hashing;
mod ollama;
mod openai;

pub use hashing::HashingEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Input text was empty; nothing is sent to the model.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with an error status.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or had the wrong shape.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Provider produced vectors of an unexpected size.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the vector store.
        expected: usize,
        /// Dimension actually returned by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Dimension of every vector this client produces.
    fn dimension(&self) -> usize;

    /// Produce one embedding per input text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Embed a single text, rejecting empty input before it reaches the provider.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        if text.trim().is_empty() {
            return Err(EmbeddingClientError::EmptyInput);
        }
        let mut vectors = self.generate_embeddings(vec![text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(EmbeddingClientError::InvalidResponse(
                "expected exactly one vector".into(),
            )),
        }
    }
}

/// Build an embedding client suitable for the given configuration.
pub fn get_embedding_client(config: &Config) -> Arc<dyn EmbeddingClient> {
    let dimension = config.embedding_dimension;
    match config.embedding_provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            dimension,
        )),
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbeddingClient::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone().unwrap_or_default(),
            config.embedding_model.clone(),
            dimension,
        )),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbeddingClient::new(dimension)),
    }
}

/// Reject empty batches and empty members before any provider call.
pub(crate) fn ensure_non_empty(texts: &[String]) -> Result<(), EmbeddingClientError> {
    if texts.is_empty() || texts.iter().any(|text| text.trim().is_empty()) {
        return Err(EmbeddingClientError::EmptyInput);
    }
    Ok(())
}

/// Check the provider returned one vector per input, each of the configured size.
pub(crate) fn validate_vectors(
    vectors: &[Vec<f32>],
    expected_count: usize,
    expected_dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected_count} vectors, got {}",
            vectors.len()
        )));
    }
    if let Some(vector) = vectors
        .iter()
        .find(|vector| vector.len() != expected_dimension)
    {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: expected_dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}
