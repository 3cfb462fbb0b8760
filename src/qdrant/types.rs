//! Qdrant error type and the response shapes the client reads.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The collection already exists with a vector width other than the embedder's.
    #[error("Collection '{collection}' holds {actual}-dimensional vectors, expected {expected}")]
    VectorSizeMismatch {
        /// Collection name.
        collection: String,
        /// Width produced by the configured embedder.
        expected: u64,
        /// Width the collection was created with.
        actual: u64,
    },
}

#[derive(Deserialize)]
pub(crate) struct CollectionInfoResponse {
    pub(crate) result: CollectionInfo,
}

/// Fields read from `GET /collections/{name}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CollectionInfo {
    #[serde(default)]
    pub(crate) points_count: Option<u64>,
    #[serde(default)]
    config: Option<CollectionConfig>,
}

impl CollectionInfo {
    /// Width of the unnamed vector; `None` for named-vector collections.
    pub(crate) fn vector_size(&self) -> Option<u64> {
        self.config.as_ref()?.params.vectors.as_ref()?.size
    }
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    #[serde(default)]
    params: CollectionParams,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionParams {
    #[serde(default)]
    vectors: Option<VectorParams>,
}

#[derive(Debug, Deserialize)]
struct VectorParams {
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResponse {
    pub(crate) result: ListCollectionsResult,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResult {
    pub(crate) collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionDescription {
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct CountResponse {
    pub(crate) result: CountResult,
}

#[derive(Deserialize)]
pub(crate) struct CountResult {
    pub(crate) count: u64,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<ScrollPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollPoint {
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collection_info_reads_unnamed_vector_size() {
        let response: CollectionInfoResponse = serde_json::from_value(json!({
            "result": {
                "status": "green",
                "points_count": 12,
                "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } }
            }
        }))
        .expect("info");
        assert_eq!(response.result.vector_size(), Some(384));
        assert_eq!(response.result.points_count, Some(12));
    }

    #[test]
    fn named_or_missing_vectors_have_no_size() {
        let named: CollectionInfo = serde_json::from_value(json!({
            "config": { "params": { "vectors": { "text": { "size": 8 } } } }
        }))
        .expect("named");
        assert_eq!(named.vector_size(), None);

        let bare: CollectionInfo = serde_json::from_value(json!({ "status": "green" })).expect("bare");
        assert_eq!(bare.vector_size(), None);
    }
}
