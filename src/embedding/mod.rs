use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

mod hashing;
mod ollama;
mod openai;

pub use hashing::HashingEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be reached or was misconfigured.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or did not match the request.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Model identifier recorded alongside stored vectors.
    fn model(&self) -> &str;

    /// Length of every vector this client produces.
    fn dimension(&self) -> usize;
}

/// Build the embedding client selected by configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    if config.embedding_dimension == 0 {
        return Err(EmbeddingClientError::ProviderUnavailable(
            "embedding dimension must be greater than zero".to_string(),
        ));
    }

    let client: Arc<dyn EmbeddingClient> = match config.embedding_provider {
        EmbeddingProvider::Hash => Arc::new(HashingEmbeddingClient::new(
            config.embedding_model.clone(),
            config.embedding_dimension,
        )),
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            config
                .ollama_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_OLLAMA_URL.to_string()),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?),
        EmbeddingProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                EmbeddingClientError::ProviderUnavailable("OPENAI_API_KEY is not set".into())
            })?;
            Arc::new(OpenAiEmbeddingClient::new(
                api_key,
                config
                    .openai_base_url
                    .clone()
                    .unwrap_or_else(|| openai::DEFAULT_OPENAI_URL.to_string()),
                config.embedding_model.clone(),
                config.embedding_dimension,
            )?)
        }
    };

    tracing::info!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Embedding client initialized"
    );
    Ok(client)
}

/// Reject provider output whose shape disagrees with the request.
pub(crate) fn validate_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    expected_dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if embeddings.len() != expected_count {
        return Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected_count} embeddings, got {}",
            embeddings.len()
        )));
    }
    if let Some(vector) = embeddings
        .iter()
        .find(|vector| vector.len() != expected_dimension)
    {
        return Err(EmbeddingClientError::InvalidResponse(format!(
            "embedding dimension mismatch: expected {expected_dimension}, got {}",
            vector.len()
        )));
    }
    Ok(())
}
