//! Fixed-size text chunking.
//!
//! Documents are cut into consecutive, non-overlapping windows of at most `max_len` characters
//! (Unicode scalar values). Concatenating the chunks of a document in ordinal order gives back
//! the original text. Chunk ids are `{source}_{ordinal}`, which keeps re-ingestion idempotent
//! and lets a whole document be located by id prefix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while cutting text into chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// A window of zero characters cannot make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// One fixed-size span of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier, `{source}_{ordinal}`.
    pub id: String,
    /// Zero-based position of the chunk within its document.
    pub ordinal: usize,
    /// Chunk text, at most `max_len` characters.
    pub text: String,
    /// Identifier of the document the chunk was cut from.
    pub source: String,
}

/// Build the chunk identifier for `source` at `ordinal`.
pub fn chunk_id(source: &str, ordinal: usize) -> String {
    format!("{source}_{ordinal}")
}

/// Return the ordinal encoded in `id` when it was produced for `source`.
pub fn parse_chunk_id(source: &str, id: &str) -> Option<usize> {
    let ordinal = id.strip_prefix(source)?.strip_prefix('_')?;
    if ordinal.is_empty() || !ordinal.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    ordinal.parse().ok()
}

/// Split `text` into chunks of at most `max_len` characters.
///
/// Empty text yields no chunks. The last chunk holds the remainder and may be shorter.
pub fn chunk_text(source: &str, text: &str, max_len: usize) -> Result<Vec<Chunk>, ChunkingError> {
    if max_len == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars_in_window = 0;

    for (offset, _) in text.char_indices() {
        if chars_in_window == max_len {
            chunks.push(build_chunk(source, chunks.len(), &text[start..offset]));
            start = offset;
            chars_in_window = 0;
        }
        chars_in_window += 1;
    }

    if start < text.len() {
        chunks.push(build_chunk(source, chunks.len(), &text[start..]));
    }

    Ok(chunks)
}

fn build_chunk(source: &str, ordinal: usize, text: &str) -> Chunk {
    Chunk {
        id: chunk_id(source, ordinal),
        ordinal,
        text: text.to_string(),
        source: source.to_string(),
    }
}
