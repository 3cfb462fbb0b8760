//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::qdrant::{
    payload::{build_payload, generate_point_id},
    types::{
        CollectionInfo, CollectionInfoResponse, CountResponse, ListCollectionsResponse,
        QdrantError,
    },
};
use crate::store::ChunkRecord;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Payload fields that receive an index when the collection is prepared.
const PAYLOAD_INDEXES: [(&str, &str); 5] = [
    ("title", "keyword"),
    ("checksum", "keyword"),
    ("chunk_index", "integer"),
    ("category", "keyword"),
    ("created_at", "datetime"),
];

/// Lightweight HTTP client for the chunk collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) collection: String,
    pub(crate) vector_size: u64,
}

impl QdrantService {
    /// Construct a client for the collection named in `config`.
    pub fn new(config: &Config) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("lexa-ai/0.1").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %config.qdrant_collection_name,
            has_api_key = %config
                .qdrant_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
            collection: config.qdrant_collection_name.clone(),
            vector_size: config.embedding_dimension as u64,
        })
    }

    /// Name of the collection this client writes to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection when missing and make sure its payload indexes exist.
    pub async fn ensure_ready(&self) -> Result<(), QdrantError> {
        self.create_collection_if_not_exists().await?;
        self.ensure_payload_indexes().await
    }

    /// Create the collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(&self) -> Result<(), QdrantError> {
        let Some(info) = self.collection_info().await? else {
            tracing::info!(
                collection = %self.collection,
                vector_size = self.vector_size,
                "Creating collection"
            );
            return self.create_collection().await;
        };

        match info.vector_size() {
            Some(actual) if actual != self.vector_size => Err(QdrantError::VectorSizeMismatch {
                collection: self.collection.clone(),
                expected: self.vector_size,
                actual,
            }),
            _ => {
                tracing::debug!(collection = %self.collection, points = ?info.points_count, "Collection already present");
                Ok(())
            }
        }
    }

    /// Create or update the collection with the configured vector size.
    pub async fn create_collection(&self) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": self.vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection ensured/created");
        })
        .await
    }

    /// Drop the collection together with every point it holds.
    pub async fn drop_collection(&self) -> Result<(), QdrantError> {
        let response = self
            .request(Method::DELETE, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Collection dropped");
        })
        .await
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections")?.send().await?;

        if response.status().is_success() {
            let payload: ListCollectionsResponse = response.json().await?;
            let names = payload
                .result
                .collections
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            Ok(names)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list collections");
            Err(error)
        }
    }

    /// Write chunk records as points in a single batch, waiting for the write to apply.
    pub async fn upsert_points(&self, records: Vec<ChunkRecord>) -> Result<usize, QdrantError> {
        if records.is_empty() {
            return Ok(0);
        }

        let count = records.len();
        let points: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": generate_point_id(),
                    "vector": record.embedding,
                    "payload": build_payload(record),
                })
            })
            .collect();

        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points?wait=true", self.collection),
            )?
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, count, "Points upserted");
        })
        .await?;

        Ok(count)
    }

    /// Count points matching `filter`, or every point when no filter is given.
    pub async fn count_points(&self, filter: Option<Value>) -> Result<u64, QdrantError> {
        let mut body = json!({ "exact": true });
        if let Some(filter) = filter {
            body["filter"] = filter;
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/count", self.collection),
            )?
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            let CountResponse { result } = response.json().await?;
            Ok(result.count)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Failed to count points");
            Err(error)
        }
    }

    /// Delete every point matching `filter`.
    pub async fn delete_points(&self, filter: Value) -> Result<(), QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/delete?wait=true", self.collection),
            )?
            .json(&json!({ "filter": filter }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = %self.collection, "Points deleted");
        })
        .await
    }

    /// Ensure standard payload indexes exist for the lookups the store performs.
    pub async fn ensure_payload_indexes(&self) -> Result<(), QdrantError> {
        for (field, schema) in PAYLOAD_INDEXES {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(
                    Method::PUT,
                    &format!("collections/{}/index", self.collection),
                )?
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(collection = %self.collection, field, schema, "Payload index ensured");
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = %self.collection, field, schema, "Payload index already exists");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = %self.collection, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    /// Whether the configured collection exists.
    pub async fn collection_exists(&self) -> Result<bool, QdrantError> {
        Ok(self.collection_info().await?.is_some())
    }

    /// Description of the configured collection, or `None` when it does not exist.
    pub(crate) async fn collection_info(&self) -> Result<Option<CollectionInfo>, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let info: CollectionInfoResponse = response.json().await?;
                Ok(Some(info.result))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
