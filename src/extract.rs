//! Plain-text extraction from uploaded document blobs.

use std::path::Path;
use thiserror::Error;

const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];
const UTF8_BOM: &str = "\u{feff}";

/// Reasons a document blob could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document identifier carries an extension this extractor does not read.
    #[error("unsupported file type for '{0}'; expected one of: txt, text, md, markdown")]
    UnsupportedExtension(String),
    /// The blob is not valid UTF-8 text.
    #[error("'{identifier}' is not valid UTF-8 text: {source}")]
    InvalidEncoding {
        /// Document identifier supplied by the caller.
        identifier: String,
        /// Decoder error describing the first invalid byte sequence.
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Capability that turns a document blob into plain text.
pub trait TextExtractor: Send + Sync {
    /// Extract the plain text content of `bytes`, using `identifier` to detect the format.
    fn extract(&self, identifier: &str, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Extractor for UTF-8 text and Markdown files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Construct a new plain-text extractor.
    pub const fn new() -> Self {
        Self
    }

    fn is_supported(identifier: &str) -> bool {
        Path::new(identifier)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            })
            .unwrap_or(false)
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, identifier: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
        if !Self::is_supported(identifier) {
            return Err(ExtractionError::UnsupportedExtension(identifier.to_string()));
        }

        let text =
            std::str::from_utf8(bytes).map_err(|source| ExtractionError::InvalidEncoding {
                identifier: identifier.to_string(),
                source,
            })?;
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
    }
}
