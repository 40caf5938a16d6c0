//! Query-side retrieval: embed the question, ask the store for its nearest chunks.

use std::sync::Arc;

use thiserror::Error;

use crate::config::MAX_TOP_K;
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::store::{QueryMatch, StoreError, VectorStore};

/// Errors surfaced while retrieving context.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query was blank.
    #[error("Query must not be empty")]
    EmptyQuery,
    /// `top_k` was outside `1..=MAX_TOP_K`.
    #[error("top_k must be between 1 and {max}, got {value}")]
    InvalidTopK {
        /// Rejected value.
        value: usize,
        /// Largest accepted value.
        max: usize,
    },
    /// Embedding the query failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The vector store query failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Embeds queries and returns the store's nearest matches unchanged.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Combine an embedding client with the store it indexed into.
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return up to `top_k` matches in descending similarity.
    ///
    /// An empty result is the "no relevant context" signal, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if top_k == 0 || top_k > MAX_TOP_K {
            return Err(RetrievalError::InvalidTopK {
                value: top_k,
                max: MAX_TOP_K,
            });
        }

        let vector = self.embedder.embed(query).await?;
        let matches = self.store.query(&vector, top_k).await?;
        tracing::debug!(top_k, matches = matches.len(), "Retrieved context");
        Ok(matches)
    }
}
