#![deny(missing_docs)]

//! Retrieval-augmented question answering over an uploaded document corpus.

/// HTTP routing and REST handlers.
pub mod api;
/// Fixed-size text chunking and chunk identifiers.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Plain-text extraction from document blobs.
pub mod extract;
/// Answer generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline activity counters.
pub mod metrics;
/// Ingestion, answering, deletion and reset.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// In-memory registry of indexed documents.
pub mod registry;
/// Query embedding and nearest-neighbour retrieval.
pub mod retrieval;
/// Vector store trait and in-memory backend.
pub mod store;
/// Pass-through persistence of raw uploads.
pub mod uploads;
