//! Core data types and error definitions for the pipeline controller.

use crate::{
    chunking::ChunkingError,
    config::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_DELETE_SCAN_LIMIT, DEFAULT_TOP_K},
    embedding::EmbeddingClientError,
    extract::ExtractionError,
    generation::GenerationClientError,
    retrieval::RetrievalError,
    store::{QueryMatch, StoreError},
};
use serde::Serialize;
use thiserror::Error;

/// Answer returned when retrieval finds nothing to ground a response in.
pub const NO_CONTEXT_ANSWER: &str = "No context available in the knowledge base.";

/// Errors emitted by the pipeline controller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be turned into text.
    #[error("Unsupported document: {0}")]
    UnsupportedFormat(#[from] ExtractionError),
    /// Chunking step rejected its parameters.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed; the document was not indexed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Generation provider failed.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationClientError),
    /// Writing to or deleting from the vector store failed.
    #[error("Vector store write failed: {0}")]
    StoreWrite(#[source] StoreError),
    /// Querying the vector store failed.
    #[error("Vector store read failed: {0}")]
    StoreRead(#[source] StoreError),
    /// A caller-facing precondition was violated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<RetrievalError> for PipelineError {
    fn from(error: RetrievalError) -> Self {
        match error {
            RetrievalError::Embedding(inner) => Self::Embedding(inner),
            RetrievalError::Store(inner) => Self::StoreRead(inner),
            other @ (RetrievalError::EmptyQuery | RetrievalError::InvalidTopK { .. }) => {
                Self::InvalidInput(other.to_string())
            }
        }
    }
}

/// Tunables for the controller, normally taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Matches retrieved per question.
    pub top_k: usize,
    /// Result cap for the prefix-scan deletion fallback.
    pub delete_scan_limit: usize,
}

impl PipelineSettings {
    /// Read the pipeline tunables out of the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            top_k: config.retrieval_top_k,
            delete_scan_limit: config.delete_scan_limit,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            delete_scan_limit: DEFAULT_DELETE_SCAN_LIMIT,
        }
    }
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Number of chunk records written to the vector store.
    pub chunks_added: usize,
}

/// Answer plus the ranked chunks it was grounded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    /// Generated answer, or a fixed placeholder.
    pub answer: String,
    /// Retrieved chunks in descending similarity.
    pub sources: Vec<QueryMatch>,
}

impl AnswerResult {
    /// The terminal answer for an empty retrieval.
    pub fn no_context() -> Self {
        Self {
            answer: NO_CONTEXT_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Status report returned by delete and reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Human readable description.
    pub message: String,
}

impl OperationStatus {
    /// Successful operation with `message`.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}
