use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

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

/// Runtime configuration for the semnotes pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of a local Ollama runtime.
    pub ollama_url: String,
    /// API key for the hosted OpenAI embeddings API.
    pub openai_api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    pub openai_base_url: String,
    /// Provider used for Q&A answers and note summaries.
    pub generation_provider: GenerationProvider,
    /// Model identifier passed to the generation provider.
    pub generation_model: String,
    /// Base URL of the Qdrant instance; the in-memory index is used when absent.
    pub qdrant_url: Option<String>,
    /// Name of the Qdrant collection holding chunk vectors.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Upper bound on words packed into a single chunk.
    pub chunk_max_words: usize,
    /// Words of a note considered for embedding; the tail beyond this is not embedded.
    pub note_max_words: usize,
    /// Capacity of the pending ingestion job queue.
    pub queue_capacity: usize,
    /// Number of long-lived ingestion workers.
    pub worker_count: usize,
    /// Minimum relevance a note needs to appear in search results.
    pub search_min_score: f32,
    /// Minimum relevance a note needs to be used as Q&A context.
    pub qa_min_score: f32,
    /// Nearest chunk vectors considered for Q&A context.
    pub qa_top_k: usize,
    /// Timeout applied to every provider HTTP call, in seconds.
    pub provider_timeout_secs: u64,
    /// Word budget for note summaries.
    pub summary_max_words: usize,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic offline embeddings derived from byte hashing.
    Hash,
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Generation disabled; Q&A and summaries fall back to canned or extractive output.
    None,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            embedding_provider: parse_or("EMBEDDING_PROVIDER", EmbeddingProvider::Hash)?,
            embedding_model: load_env_or("EMBEDDING_MODEL", "nomic-embed-text"),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", 768)?,
            ollama_url: load_env_or("OLLAMA_URL", "http://127.0.0.1:11434"),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            generation_provider: parse_or("GENERATION_PROVIDER", GenerationProvider::None)?,
            generation_model: load_env_or("GENERATION_MODEL", "llama3.2"),
            qdrant_url: load_env_optional("QDRANT_URL"),
            qdrant_collection_name: load_env_or("QDRANT_COLLECTION_NAME", "notes"),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            chunk_max_words: parse_or("CHUNK_MAX_WORDS", 200)?,
            note_max_words: parse_or("NOTE_MAX_WORDS", 4000)?,
            queue_capacity: parse_or("QUEUE_CAPACITY", 100)?,
            worker_count: parse_or("WORKER_COUNT", 3)?,
            search_min_score: parse_or("SEARCH_MIN_SCORE", 0.3)?,
            qa_min_score: parse_or("QA_MIN_SCORE", 0.4)?,
            qa_top_k: parse_or("QA_TOP_K", 5)?,
            provider_timeout_secs: parse_or("PROVIDER_TIMEOUT_SECS", 30)?,
            summary_max_words: parse_or("SUMMARY_MAX_WORDS", 80)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.chunk_max_words == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_MAX_WORDS".into()));
        }
        if self.note_max_words == 0 {
            return Err(ConfigError::InvalidValue("NOTE_MAX_WORDS".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("QUEUE_CAPACITY".into()));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidValue("WORKER_COUNT".into()));
        }
        if self.embedding_provider == EmbeddingProvider::OpenAI && self.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        Ok(())
    }

    /// Timeout applied to provider HTTP clients.
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: "nomic-embed-text".into(),
            embedding_dimension: 768,
            ollama_url: "http://127.0.0.1:11434".into(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".into(),
            generation_provider: GenerationProvider::None,
            generation_model: "llama3.2".into(),
            qdrant_url: None,
            qdrant_collection_name: "notes".into(),
            qdrant_api_key: None,
            chunk_max_words: 200,
            note_max_words: 4000,
            queue_capacity: 100,
            worker_count: 3,
            search_min_score: 0.3,
            qa_min_score: 0.4,
            qa_top_k: 5,
            provider_timeout_secs: 30,
            summary_max_words: 80,
        }
    }
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" | "local" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        generation_provider = ?config.generation_provider,
        qdrant_url = ?config.qdrant_url,
        queue_capacity = config.queue_capacity,
        worker_count = config.worker_count,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
