use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
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
    /// Configuration was loaded twice in the same process.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the Lexa AI service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend that persists chunk records.
    pub store_backend: StoreBackend,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document chunks.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// API key for OpenAI-compatible embedding endpoints.
    pub openai_api_key: Option<String>,
    /// Base URL override for OpenAI-compatible embedding endpoints.
    pub openai_base_url: Option<String>,
    /// Backend that produces query/passage relevance scores.
    pub rerank_provider: RerankProvider,
    /// Base URL of the cross-encoder rerank endpoint.
    pub rerank_url: Option<String>,
    /// Target words per chunk.
    pub chunk_size: usize,
    /// Words repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Largest request body accepted by the ingest endpoints, in bytes.
    pub max_upload_bytes: usize,
    /// Seconds a finished bulk job stays queryable.
    pub job_retention_secs: u64,
}

/// Default body limit for `/ingest` and `/ingest/bulk`.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Supported storage backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Qdrant over its HTTP API.
    Qdrant,
    /// Process-local store; contents vanish on restart.
    Memory,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API (or a compatible server).
    OpenAI,
    /// Deterministic feature hashing, no external service.
    Hash,
}

/// Supported relevance scoring backends for reranking.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RerankProvider {
    /// Cross-encoder served over HTTP.
    Http,
    /// Term-overlap scoring computed in process.
    Lexical,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Qdrant,
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_collection_name: "documents".into(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: "all-minilm".into(),
            embedding_dimension: 384,
            ollama_url: None,
            openai_api_key: None,
            openai_base_url: None,
            rerank_provider: RerankProvider::Lexical,
            rerank_url: None,
            chunk_size: 500,
            chunk_overlap: 50,
            server_port: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            job_retention_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            store_backend: parse_or("STORE_BACKEND", defaults.store_backend)?,
            qdrant_url: load_env_optional("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or(defaults.qdrant_collection_name),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL"),
            rerank_provider: parse_or("RERANK_PROVIDER", defaults.rerank_provider)?,
            rerank_url: load_env_optional("RERANK_URL"),
            chunk_size: parse_or("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            job_retention_secs: parse_or("JOB_RETENTION_SECS", defaults.job_retention_secs)?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl FromStr for RerankProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "lexical" => Ok(Self::Lexical),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the global cache.
///
/// Reads a `.env` file when present. The configuration is read exactly once; there is no
/// hot reload.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        store = ?config.store_backend,
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        server_port = ?config.server_port,
        max_upload_bytes = config.max_upload_bytes,
        embedding_provider = ?config.embedding_provider,
        rerank_provider = ?config.rerank_provider,
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    CONFIG.get().ok_or(ConfigError::AlreadyInitialized)
}
