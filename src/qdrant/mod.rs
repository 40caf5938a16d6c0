//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
pub mod types;

pub use client::QdrantService;
pub use filters::{source_filter, source_filter_except};
pub use payload::point_id;
pub use types::{QdrantError, ScoredPoint};
