use crate::config::{Config, RerankProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

pub(crate) const DEFAULT_RERANK_URL: &str = "http://127.0.0.1:8080";

/// Errors raised by relevance scorers.
#[derive(Debug, Error)]
pub enum ScorerError {
    /// Scoring backend could not be reached or was misconfigured.
    #[error("Relevance scorer unavailable: {0}")]
    Unavailable(String),
    /// Backend answered with something other than one score per text.
    #[error("Malformed scorer response: {0}")]
    InvalidResponse(String),
}

/// Produces one raw relevance score per text for a query. Higher means more relevant.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score each of `texts` against `query`, returning scores in input order.
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, ScorerError>;
}

/// Cross-encoder served behind a `/rerank` endpoint that accepts `{query, texts}`.
pub struct HttpCrossEncoder {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RankedText {
    index: usize,
    score: f32,
}

impl HttpCrossEncoder {
    /// Construct a scorer targeting `base_url`.
    pub fn new(base_url: String) -> Result<Self, ScorerError> {
        let http = Client::builder()
            .user_agent("lexa-ai/rerank")
            .build()
            .map_err(|error| ScorerError::Unavailable(error.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self) -> String {
        format!("{}/rerank", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RelevanceScorer for HttpCrossEncoder {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, ScorerError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({
                "query": query,
                "texts": texts,
                "raw_scores": true,
            }))
            .send()
            .await
            .map_err(|error| {
                ScorerError::Unavailable(format!(
                    "failed to reach reranker at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScorerError::Unavailable(format!(
                "reranker returned {status}: {body}"
            )));
        }

        let ranked: Vec<RankedText> = response.json().await.map_err(|error| {
            ScorerError::InvalidResponse(format!("failed to decode reranker response: {error}"))
        })?;

        let mut scores = vec![None; texts.len()];
        for item in ranked {
            let slot = scores.get_mut(item.index).ok_or_else(|| {
                ScorerError::InvalidResponse(format!("score index {} out of range", item.index))
            })?;
            *slot = Some(item.score);
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| {
                score.ok_or_else(|| {
                    ScorerError::InvalidResponse(format!("missing score for text {index}"))
                })
            })
            .collect()
    }
}

/// In-process scorer: fraction of distinct query terms that appear in the text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalOverlapScorer;

fn terms(text: &str) -> HashSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl RelevanceScorer for LexicalOverlapScorer {
    async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, ScorerError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![0.0; texts.len()]);
        }

        Ok(texts
            .iter()
            .map(|text| {
                let text_terms = terms(text);
                let hits = query_terms
                    .iter()
                    .filter(|term| text_terms.contains(*term))
                    .count();
                hits as f32 / query_terms.len() as f32
            })
            .collect())
    }
}

/// Build the relevance scorer selected by configuration.
pub fn build_scorer(config: &Config) -> Result<Arc<dyn RelevanceScorer>, ScorerError> {
    let scorer: Arc<dyn RelevanceScorer> = match config.rerank_provider {
        RerankProvider::Lexical => Arc::new(LexicalOverlapScorer),
        RerankProvider::Http => Arc::new(HttpCrossEncoder::new(
            config
                .rerank_url
                .clone()
                .unwrap_or_else(|| DEFAULT_RERANK_URL.to_string()),
        )?),
    };
    tracing::info!(provider = ?config.rerank_provider, "Relevance scorer initialized");
    Ok(scorer)
}
