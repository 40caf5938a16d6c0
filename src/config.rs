use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Default number of characters per chunk when `CHUNK_SIZE` is unset.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default number of matches retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;
/// Upper bound accepted for `RETRIEVAL_TOP_K`.
pub const MAX_TOP_K: usize = 50;
/// Default number of records sent per vector store write.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;
/// Default result cap for the client-side prefix deletion scan.
pub const DEFAULT_DELETE_SCAN_LIMIT: usize = 10_000;
/// Ollama endpoint used when `OLLAMA_URL` is unset.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
/// OpenAI endpoint used when `OPENAI_BASE_URL` is unset.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
/// Gemini endpoint used when `GEMINI_BASE_URL` is unset.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the knowledge base server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding the corpus.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime (embeddings and generation).
    pub ollama_url: String,
    /// Bearer token for the OpenAI embeddings API.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible embeddings API.
    pub openai_base_url: String,
    /// Generative model backend used to synthesize answers.
    pub generation_provider: GenerationProvider,
    /// Generative model identifier.
    pub generation_model: String,
    /// API key for the Gemini REST API.
    pub gemini_api_key: Option<String>,
    /// Base URL of the Gemini REST API.
    pub gemini_base_url: String,
    /// Maximum number of characters per chunk.
    pub chunk_size: usize,
    /// Number of matches retrieved for each question.
    pub retrieval_top_k: usize,
    /// Number of records sent per vector store write request.
    pub upsert_batch_size: usize,
    /// Result cap for the client-side prefix deletion scan.
    pub delete_scan_limit: usize,
    /// Optional directory where raw uploads are kept.
    pub upload_dir: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Deterministic local hashing, no model required.
    Hashing,
}

/// Supported answer generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env("EMBEDDING_DIMENSION")?
                .ok_or_else(|| ConfigError::MissingVariable("EMBEDDING_DIMENSION".to_string()))?,
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            generation_provider: load_env("GENERATION_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("GENERATION_PROVIDER".to_string()))?,
            generation_model: load_env("GENERATION_MODEL")?,
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            chunk_size: parse_env("CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE),
            retrieval_top_k: parse_env("RETRIEVAL_TOP_K")?.unwrap_or(DEFAULT_TOP_K),
            upsert_batch_size: parse_env("UPSERT_BATCH_SIZE")?
                .unwrap_or(DEFAULT_UPSERT_BATCH_SIZE),
            delete_scan_limit: parse_env("DELETE_SCAN_LIMIT")?
                .unwrap_or(DEFAULT_DELETE_SCAN_LIMIT),
            upload_dir: load_env_optional("UPLOAD_DIR"),
            server_port: parse_env("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check bounds and provider credentials that cannot be expressed by parsing alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if !(1..=MAX_TOP_K).contains(&self.retrieval_top_k) {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        if self.upsert_batch_size == 0 {
            return Err(ConfigError::InvalidValue("UPSERT_BATCH_SIZE".into()));
        }
        if self.delete_scan_limit == 0 {
            return Err(ConfigError::InvalidValue("DELETE_SCAN_LIMIT".into()));
        }
        if self.embedding_provider == EmbeddingProvider::OpenAI && self.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        if self.generation_provider == GenerationProvider::Gemini && self.gemini_api_key.is_none()
        {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }
        Ok(())
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hashing" | "hash" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        generation_provider = ?config.generation_provider,
        chunk_size = config.chunk_size,
        top_k = config.retrieval_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        qdrant_url: "http://127.0.0.1:6333".into(),
        qdrant_collection_name: "knowledge-test".into(),
        qdrant_api_key: None,
        embedding_provider: EmbeddingProvider::Hashing,
        embedding_model: "hashing".into(),
        embedding_dimension: 64,
        ollama_url: DEFAULT_OLLAMA_URL.into(),
        openai_api_key: None,
        openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
        generation_provider: GenerationProvider::Ollama,
        generation_model: "llama3".into(),
        gemini_api_key: None,
        gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
        chunk_size: DEFAULT_CHUNK_SIZE,
        retrieval_top_k: DEFAULT_TOP_K,
        upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        delete_scan_limit: DEFAULT_DELETE_SCAN_LIMIT,
        upload_dir: None,
        server_port: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("Ollama".parse(), Ok(EmbeddingProvider::Ollama));
        assert_eq!("OPENAI".parse(), Ok(EmbeddingProvider::OpenAI));
        assert_eq!("hash".parse(), Ok(EmbeddingProvider::Hashing));
        assert!("faiss".parse::<EmbeddingProvider>().is_err());
        assert_eq!(" gemini ".parse(), Ok(GenerationProvider::Gemini));
        assert!("claude".parse::<GenerationProvider>().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_bounds() {
        let mut config = test_config();
        config.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "CHUNK_SIZE"
        ));

        let mut config = test_config();
        config.retrieval_top_k = MAX_TOP_K + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "RETRIEVAL_TOP_K"
        ));
    }

    #[test]
    fn validate_requires_provider_credentials() {
        let mut config = test_config();
        config.generation_provider = GenerationProvider::Gemini;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingVariable(key)) if key == "GEMINI_API_KEY"
        ));

        config.gemini_api_key = Some("secret".into());
        config.embedding_provider = EmbeddingProvider::OpenAI;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingVariable(key)) if key == "OPENAI_API_KEY"
        ));
    }
}
