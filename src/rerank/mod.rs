//! Candidate reranking with blended relevance scores.
//!
//! Each candidate's final score mixes the caller's vector and lexical scores with a relevance
//! signal from a [`RelevanceScorer`], min-max normalized across the candidates of one call:
//!
//! `final = 0.5 * vectorScore + 0.3 * lexicalScore + 0.2 * normalized`
//!
//! Reranking is best effort. When the scorer fails the candidates come back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

mod scorer;

pub use scorer::{
    HttpCrossEncoder, LexicalOverlapScorer, RelevanceScorer, ScorerError, build_scorer,
};

/// Maximum number of candidates returned.
pub const MAX_RESULTS: usize = 5;
/// Characters of candidate content sent to the scorer.
pub const CONTENT_PREFIX_CHARS: usize = 512;

const VECTOR_WEIGHT: f64 = 0.5;
const LEXICAL_WEIGHT: f64 = 0.3;
const RELEVANCE_WEIGHT: f64 = 0.2;

/// A candidate document as supplied by the caller. Unknown fields round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(Map<String, Value>);

impl Candidate {
    /// Candidate text; empty when absent or not a string.
    pub fn content(&self) -> &str {
        self.0.get("content").and_then(Value::as_str).unwrap_or_default()
    }

    /// Caller-provided vector similarity, 0 when absent or non-numeric.
    pub fn vector_score(&self) -> f64 {
        self.numeric("vectorScore").unwrap_or(0.0)
    }

    /// Caller-provided lexical score, 0 when absent or non-numeric.
    pub fn lexical_score(&self) -> f64 {
        self.numeric("lexicalScore").unwrap_or(0.0)
    }

    /// Normalized relevance assigned by the last rerank.
    pub fn cross_score(&self) -> Option<f64> {
        self.numeric("crossScore")
    }

    /// Blended score assigned by the last rerank.
    pub fn final_score(&self) -> Option<f64> {
        self.numeric("finalScore")
    }

    /// Underlying JSON fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    fn numeric(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn annotate(&mut self, cross: f64, final_score: f64) {
        self.0.insert("crossScore".into(), score_value(cross));
        self.0.insert("finalScore".into(), score_value(final_score));
    }
}

fn score_value(score: f64) -> Value {
    serde_json::Number::from_f64(score)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Min-max scale raw scores into `[0, 1]`. Equal scores all map to 0.
pub fn normalize(scores: &[f32]) -> Vec<f64> {
    let values: Vec<f64> = scores.iter().map(|score| f64::from(*score)).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };
    values.iter().map(|value| (value - min) / range).collect()
}

/// Round to four decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Character-boundary-safe prefix of at most `max_chars` characters.
fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Rerank `candidates` against `query` and keep the best [`MAX_RESULTS`].
///
/// A blank query or an empty list is returned as is without calling the scorer.
pub async fn rerank(
    scorer: &dyn RelevanceScorer,
    query: &str,
    candidates: Vec<Candidate>,
) -> Vec<Candidate> {
    if query.trim().is_empty() || candidates.is_empty() {
        return candidates;
    }

    let texts: Vec<String> = candidates
        .iter()
        .map(|candidate| prefix(candidate.content(), CONTENT_PREFIX_CHARS))
        .collect();

    let raw = match scorer.score(query, &texts).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, "Relevance scoring failed; returning candidates unranked");
            return candidates;
        }
    };

    if raw.len() != candidates.len() {
        tracing::warn!(
            expected = candidates.len(),
            actual = raw.len(),
            "Scorer returned wrong number of scores; returning candidates unranked"
        );
        return candidates;
    }
    if raw.iter().any(|score| !score.is_finite()) {
        tracing::warn!("Scorer returned non-finite scores; returning candidates unranked");
        return candidates;
    }

    let normalized = normalize(&raw);
    let mut ranked: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .zip(normalized)
        .map(|(mut candidate, relevance)| {
            let blended = round4(
                VECTOR_WEIGHT * candidate.vector_score()
                    + LEXICAL_WEIGHT * candidate.lexical_score()
                    + RELEVANCE_WEIGHT * relevance,
            );
            candidate.annotate(round4(relevance), blended);
            (blended, candidate)
        })
        .collect();

    ranked.sort_by(|left, right| right.0.partial_cmp(&left.0).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, candidate)| candidate)
        .collect()
}
