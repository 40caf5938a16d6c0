//! Answer generation clients.
//!
//! The pipeline assembles the full prompt; clients only transport it to a model and extract
//! the answer text. A well-formed response that carries no usable text yields
//! [`NO_ANSWER_PLACEHOLDER`] instead of an error.

mod gemini;
mod ollama;

pub use gemini::GeminiGenerationClient;
pub use ollama::OllamaGenerationClient;

use crate::config::{Config, GenerationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Answer returned when the model produced no text-bearing content.
pub const NO_ANSWER_PLACEHOLDER: &str = "No answer generated.";

/// Errors surfaced while generating answers.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider could not be reached.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by generative model backends.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send a fully assembled prompt and return the extracted answer text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError>;
}

/// Build a generation client for the configured provider.
pub fn get_generation_client(config: &Config) -> Arc<dyn GenerationClient> {
    match config.generation_provider {
        GenerationProvider::Gemini => Arc::new(GeminiGenerationClient::new(
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone().unwrap_or_default(),
            config.generation_model.clone(),
        )),
        GenerationProvider::Ollama => Arc::new(OllamaGenerationClient::new(
            config.ollama_url.clone(),
            config.generation_model.clone(),
        )),
    }
}

/// Replace blank model output with the placeholder answer.
pub(crate) fn or_placeholder(text: String) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NO_ANSWER_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_output_becomes_placeholder() {
        assert_eq!(or_placeholder("  \n".into()), NO_ANSWER_PLACEHOLDER);
        assert_eq!(or_placeholder(" 42 ".into()), "42");
    }
}
