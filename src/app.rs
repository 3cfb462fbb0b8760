//! Application wiring: builds the shared state handed to the HTTP router.

use crate::{
    config::{Config, DEFAULT_MAX_UPLOAD_BYTES, StoreBackend},
    embedding::{EmbeddingClientError, build_embedding_client},
    processing::{ChunkingError, ChunkingPolicy, IngestionService, JobRegistry},
    qdrant::{QdrantError, QdrantService},
    rerank::{RelevanceScorer, ScorerError, build_scorer},
    store::{DocumentStore, MemoryStore},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Chunk size or overlap is unusable.
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding backend could not be constructed.
    #[error("Embedding client setup failed: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Relevance scorer could not be constructed.
    #[error("Relevance scorer setup failed: {0}")]
    Scorer(#[from] ScorerError),
    /// Qdrant was unreachable or rejected collection setup.
    #[error("Qdrant setup failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Static descriptor returned by `GET /`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceInfo {
    /// Service name.
    pub service: &'static str,
    /// Always `"running"`.
    pub status: &'static str,
    /// Embedding model tag.
    pub model: String,
    /// Embedding vector length.
    pub dimensions: usize,
    /// Crate version.
    pub version: &'static str,
}

impl ServiceInfo {
    /// Descriptor for the given embedding model.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            service: "Lexa AI Service",
            status: "running",
            model: model.into(),
            dimensions,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Shared handles used by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Ingestion pipeline.
    pub ingestion: Arc<IngestionService>,
    /// Registry of bulk jobs.
    pub jobs: JobRegistry,
    /// Relevance scorer used by `/rerank`.
    pub scorer: Arc<dyn RelevanceScorer>,
    /// Service descriptor.
    pub info: ServiceInfo,
    /// Body limit applied to the ingest routes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Assemble state from already constructed collaborators.
    pub fn new(ingestion: Arc<IngestionService>, scorer: Arc<dyn RelevanceScorer>) -> Self {
        let info = ServiceInfo::new(ingestion.model(), ingestion.dimension());
        Self {
            ingestion,
            jobs: JobRegistry::new(),
            scorer,
            info,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Replace the ingest body limit.
    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Replace the job registry with one that keeps finished jobs for `retention`.
    pub fn with_job_retention(mut self, retention: Duration) -> Self {
        self.jobs = JobRegistry::with_retention(retention);
        self
    }
}

/// Build the application state selected by `config`.
///
/// With the Qdrant backend the collection and its payload indexes are created before the
/// server starts accepting requests.
pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let policy = ChunkingPolicy::new(config.chunk_size, config.chunk_overlap)?;
    let embedder = build_embedding_client(config)?;
    let scorer = build_scorer(config)?;

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Qdrant => {
            let qdrant = QdrantService::new(config)?;
            tracing::debug!(collection = %qdrant.collection(), "Ensuring primary collection");
            qdrant.ensure_ready().await?;
            tracing::debug!(collection = %qdrant.collection(), "Primary collection ready");
            Arc::new(qdrant)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let ingestion = Arc::new(IngestionService::new(embedder, store, policy));
    Ok(AppState::new(ingestion, scorer)
        .with_upload_limit(config.max_upload_bytes)
        .with_job_retention(Duration::from_secs(config.job_retention_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingProvider, RerankProvider};

    #[tokio::test]
    async fn memory_backend_builds_without_external_services() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            embedding_provider: EmbeddingProvider::Hash,
            rerank_provider: RerankProvider::Lexical,
            embedding_dimension: 32,
            max_upload_bytes: 4096,
            ..Config::default()
        };

        let state = build_state(&config).await.expect("state");
        assert_eq!(state.info.dimensions, 32);
        assert_eq!(state.max_upload_bytes, 4096);
        assert_eq!(state.info.model, "all-minilm");
        assert!(state.ingestion.store().ping().await.is_ok());
    }

    #[tokio::test]
    async fn invalid_chunking_is_rejected_at_startup() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            chunk_size: 10,
            chunk_overlap: 10,
            ..Config::default()
        };

        let err = build_state(&config).await.err().expect("startup error");
        assert!(matches!(err, StartupError::Chunking(_)));
    }
}
