//! Vector store abstraction.
//!
//! A store owns `{id -> (vector, metadata)}` records. Upserts replace records with the same id,
//! queries rank by cosine similarity, and deletes are idempotent. Collection provisioning
//! (dimension, metric) happens once at startup, outside this trait.

mod memory;

pub use memory::InMemoryVectorStore;

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Qdrant transport or protocol failure.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// A vector did not match the store's configured dimension.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was provisioned with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Some records were committed before a later write failed.
    #[error("partial write: {written} of {total} records stored before failure: {reason}")]
    PartialWrite {
        /// Records committed before the failure.
        written: usize,
        /// Records in the request.
        total: usize,
        /// Description of the failing write.
        reason: String,
    },
    /// The backend lacks the requested capability.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),
}

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    /// Chunk text.
    pub text: String,
    /// Identifier of the source document.
    pub source: String,
    /// Position of the chunk within its source.
    pub ordinal: usize,
}

/// A vector plus metadata, addressed by chunk id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Chunk id, `{source}_{ordinal}`.
    pub id: String,
    /// Embedding of the chunk text.
    pub vector: Vec<f32>,
    /// Metadata returned with query matches.
    pub metadata: RecordMetadata,
}

/// One retrieved chunk with its source attribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    /// Chunk text.
    pub text: String,
    /// Identifier of the document the chunk came from.
    pub source: String,
    /// Cosine similarity to the query (higher is closer).
    pub score: f32,
}

/// Result of a successful upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Records written (inserted or replaced).
    pub written: usize,
}

/// Interface implemented by vector store backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<UpsertSummary, StoreError>;

    /// Return up to `top_k` matches ordered by descending similarity.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, StoreError>;

    /// Remove exactly the given ids; unknown ids are ignored.
    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), StoreError>;

    /// Remove every record.
    async fn delete_all(&self) -> Result<(), StoreError>;

    /// List record ids, stopping after `limit` entries.
    async fn list_ids(&self, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Whether [`VectorStore::delete_by_source`] is implemented natively.
    fn supports_source_filter(&self) -> bool {
        false
    }

    /// Remove every record whose `source` metadata equals `source`, sparing the ids in `keep`.
    async fn delete_by_source(
        &self,
        _source: &str,
        _keep: &BTreeSet<String>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("delete_by_source"))
    }
}

/// Cosine similarity in `[-1, 1]`; zero vectors score `0`.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
