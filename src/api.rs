//! HTTP surface for the Lexa AI service.
//!
//! The router exposes the ingestion and retrieval-support endpoints:
//!
//! - `GET /` and `GET /health` describe the service and check the document store.
//! - `POST /embed` and `POST /embed-batch` return raw embedding vectors.
//! - `POST /rerank` blends caller scores with a relevance signal and keeps the top five.
//! - `POST /ingest` chunks, embeds, and stores one document (replacing by title).
//! - `POST /ingest/bulk` queues files for background ingestion; poll `GET /ingest/jobs/:id`.
//! - `GET /documents`, `GET /documents/stats`, `DELETE /documents/:title`, and
//!   `DELETE /documents/clear` manage stored documents.
//! - `GET /metrics` reports ingestion counters.
//!
//! The ingest routes accept bodies up to [`AppState::max_upload_bytes`]; larger bodies are
//! answered with 413. Failures are returned as `{"error": message, "kind": tag}`.

use crate::{
    app::{AppState, ServiceInfo},
    metrics::MetricsSnapshot,
    processing::{
        BulkAccepted, BulkFile, DocumentInput, IngestOutcome, JobSnapshot, ServiceError,
        start_bulk_ingest,
    },
    rerank::{Candidate, rerank},
    store::{DocumentSummary, StoreStats},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Maximum number of documents returned by `GET /documents`.
const DOCUMENT_LIST_LIMIT: usize = 100;
/// Characters of input echoed back by `POST /embed`.
const TEXT_PREVIEW_CHARS: usize = 100;

/// Build the HTTP router over the shared application state.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/embed", post(embed))
        .route("/embed-batch", post(embed_batch))
        .route("/rerank", post(rerank_docs))
        .route(
            "/ingest",
            post(ingest_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/ingest/bulk",
            post(ingest_bulk).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/ingest/jobs/:id", get(job_status))
        .route("/jobs/:id", get(job_status))
        .route("/documents", get(list_documents))
        .route("/documents/stats", get(document_stats))
        .route("/documents/clear", delete(clear_documents))
        .route("/documents/:title", delete(delete_document))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(state.info.clone())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    store_reachable: bool,
}

/// Liveness plus a store reachability check; always answers 200.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_reachable = match state.ingestion.store().ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the document store");
            false
        }
    };
    Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
        store_reachable,
    })
}

#[derive(Deserialize)]
struct EmbedRequest {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
    dimensions: usize,
    text_preview: String,
}

async fn embed(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, AppError> {
    let Json(request) = payload?;
    let embedding = state.ingestion.embed(&request.text).await?;
    Ok(Json(EmbedResponse {
        dimensions: embedding.len(),
        embedding,
        text_preview: request.text.chars().take(TEXT_PREVIEW_CHARS).collect(),
    }))
}

#[derive(Deserialize)]
struct EmbedBatchRequest {
    #[serde(default)]
    texts: Vec<String>,
}

#[derive(Serialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_batch(
    State(state): State<AppState>,
    payload: Result<Json<EmbedBatchRequest>, JsonRejection>,
) -> Result<Json<EmbedBatchResponse>, AppError> {
    let Json(request) = payload?;
    let embeddings = state.ingestion.embed_batch(request.texts).await?;
    Ok(Json(EmbedBatchResponse { embeddings }))
}

#[derive(Deserialize)]
struct RerankRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    docs: Vec<Candidate>,
}

#[derive(Serialize)]
struct RerankResponse {
    docs: Vec<Candidate>,
}

async fn rerank_docs(
    State(state): State<AppState>,
    payload: Result<Json<RerankRequest>, JsonRejection>,
) -> Result<Json<RerankResponse>, AppError> {
    let Json(request) = payload?;
    let docs = rerank(state.scorer.as_ref(), &request.query, request.docs).await;
    Ok(Json(RerankResponse { docs }))
}

async fn ingest_document(
    State(state): State<AppState>,
    payload: Result<Json<DocumentInput>, JsonRejection>,
) -> Result<Json<IngestOutcome>, AppError> {
    let Json(input) = payload?;
    let outcome = state.ingestion.ingest_document(input).await?;
    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct BulkRequest {
    #[serde(default)]
    files: Vec<BulkFile>,
    #[serde(default, rename = "userId")]
    owner: Option<String>,
}

async fn ingest_bulk(
    State(state): State<AppState>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Result<Json<BulkAccepted>, AppError> {
    let Json(request) = payload?;
    let accepted = start_bulk_ingest(
        state.ingestion.clone(),
        state.jobs.clone(),
        request.files,
        request.owner,
    )
    .await?;
    Ok(Json(accepted))
}

async fn job_status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let snapshot: Option<JobSnapshot> = match Uuid::parse_str(&id) {
        Ok(job_id) => state.jobs.get(job_id).await,
        Err(_) => None,
    };

    match snapshot {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "status": "not_found" }))).into_response(),
    }
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
    total: usize,
}

async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let documents = state
        .ingestion
        .store()
        .list_documents(DOCUMENT_LIST_LIMIT)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(DocumentsResponse {
        total: documents.len(),
        documents,
    }))
}

async fn document_stats(State(state): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    let stats = state
        .ingestion
        .store()
        .stats()
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(stats))
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: u64,
}

async fn delete_document(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state
        .ingestion
        .store()
        .delete_by_title(&title)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(title = %title, deleted, "Document deleted");
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Serialize)]
struct ClearResponse {
    deleted_count: u64,
}

async fn clear_documents(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    let deleted_count = state
        .ingestion
        .store()
        .clear()
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(deleted_count, "Document store cleared");
    Ok(Json(ClearResponse { deleted_count }))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.ingestion.metrics_snapshot())
}

enum AppError {
    Service(ServiceError),
    PayloadTooLarge(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Service(ServiceError::Validation(_) | ServiceError::Extract(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::Embedding(_)) => StatusCode::BAD_GATEWAY,
            Self::Service(ServiceError::Storage(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Service(inner) => inner.kind(),
            Self::PayloadTooLarge(_) => "payload_too_large",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Service(inner) => inner.to_string(),
            Self::PayloadTooLarge(message) => message.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(error = %message, kind = self.kind(), "Request failed");
        } else if status == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::warn!(error = %message, "Request body over upload limit");
        }
        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self::Service(inner)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::Service(ServiceError::Validation(rejection.body_text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::app::AppState;
    use crate::embedding::{EmbeddingClient, EmbeddingClientError, HashingEmbeddingClient};
    use crate::processing::{ChunkingPolicy, IngestionService};
    use crate::rerank::{LexicalOverlapScorer, RelevanceScorer, ScorerError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct OfflineEmbedder;

    #[async_trait]
    impl EmbeddingClient for OfflineEmbedder {
        async fn generate_embeddings(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Err(EmbeddingClientError::ProviderUnavailable("connection refused".into()))
        }

        fn model(&self) -> &str {
            "offline"
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl RelevanceScorer for FixedScorer {
        async fn score(&self, _query: &str, _texts: &[String]) -> Result<Vec<f32>, ScorerError> {
            Ok(self.0.clone())
        }
    }

    fn app_with(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<MemoryStore>,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Router {
        let ingestion = Arc::new(IngestionService::new(
            embedder,
            store,
            ChunkingPolicy::default(),
        ));
        create_router(AppState::new(ingestion, scorer))
    }

    fn default_app(store: Arc<MemoryStore>) -> Router {
        app_with(
            Arc::new(HashingEmbeddingClient::new("hash-test", 8)),
            store,
            Arc::new(LexicalOverlapScorer),
        )
    }

    fn limited_app(store: Arc<MemoryStore>, max_upload_bytes: usize) -> Router {
        let ingestion = Arc::new(IngestionService::new(
            Arc::new(HashingEmbeddingClient::new("hash-test", 8)),
            store,
            ChunkingPolicy::default(),
        ));
        let state = AppState::new(ingestion, Arc::new(LexicalOverlapScorer))
            .with_upload_limit(max_upload_bytes);
        create_router(state)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    #[tokio::test]
    async fn root_describes_service() {
        let (status, body) = send(
            default_app(Arc::new(MemoryStore::new())),
            Method::GET,
            "/",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "Lexa AI Service");
        assert_eq!(body["status"], "running");
        assert_eq!(body["model"], "hash-test");
        assert_eq!(body["dimensions"], 8);
    }

    #[tokio::test]
    async fn health_reports_store_reachability() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let (status, body) = send(default_app(store), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["store_reachable"], false);
    }

    #[tokio::test]
    async fn embed_returns_vector_and_rejects_blank_text() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            default_app(store.clone()),
            Method::POST,
            "/embed",
            Some(json!({ "text": "vacation policy" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dimensions"], 8);
        assert_eq!(body["embedding"].as_array().map(Vec::len), Some(8));

        let (status, body) = send(
            default_app(store),
            Method::POST,
            "/embed",
            Some(json!({ "text": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");
    }

    #[tokio::test]
    async fn embed_batch_preserves_order_and_accepts_empty_lists() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            default_app(store.clone()),
            Method::POST,
            "/embed-batch",
            Some(json!({ "texts": ["one", "two", "three"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embeddings"].as_array().map(Vec::len), Some(3));

        let (status, body) = send(
            default_app(store),
            Method::POST,
            "/embed-batch",
            Some(json!({ "texts": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["embeddings"], json!([]));
    }

    #[tokio::test]
    async fn provider_failures_map_to_bad_gateway() {
        let app = app_with(
            Arc::new(OfflineEmbedder),
            Arc::new(MemoryStore::new()),
            Arc::new(LexicalOverlapScorer),
        );
        let (status, body) = send(
            app,
            Method::POST,
            "/embed",
            Some(json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "provider_failure");
        assert!(body["error"].as_str().unwrap_or_default().contains("connection refused"));
    }

    #[tokio::test]
    async fn rerank_route_annotates_and_orders_docs() {
        let app = app_with(
            Arc::new(HashingEmbeddingClient::new("hash-test", 8)),
            Arc::new(MemoryStore::new()),
            Arc::new(FixedScorer(vec![0.9, 0.1])),
        );
        let (status, body) = send(
            app,
            Method::POST,
            "/rerank",
            Some(json!({
                "query": "x",
                "docs": [
                    { "content": "a", "vectorScore": 0.8, "lexicalScore": 0.2 },
                    { "content": "b", "vectorScore": 0.1, "lexicalScore": 0.1 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let docs = body["docs"].as_array().expect("docs");
        assert_eq!(docs[0]["content"], "a");
        assert_eq!(docs[0]["finalScore"], 0.66);
        assert_eq!(docs[1]["finalScore"], 0.08);
        assert_eq!(docs[1]["crossScore"], 0.0);
    }

    #[tokio::test]
    async fn ingest_validates_and_reports_chunks() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            default_app(store.clone()),
            Method::POST,
            "/ingest",
            Some(json!({ "title": "", "content": "body" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation_error");

        let (status, body) = send(
            default_app(store.clone()),
            Method::POST,
            "/ingest",
            Some(json!({
                "title": "Handbook",
                "content": "vacation policy details for every employee",
                "category": "HR",
                "tags": ["policy"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["duplicate"], false);
        assert_eq!(body["chunks_created"], 1);
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = default_app(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/ingest")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_failures_map_to_service_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let (status, body) = send(
            default_app(store),
            Method::DELETE,
            "/documents/clear",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "storage_unavailable");
    }

    #[tokio::test]
    async fn unknown_jobs_return_not_found() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            default_app(store.clone()),
            Method::GET,
            "/ingest/jobs/not-a-uuid",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "not_found");

        let uri = format!("/jobs/{}", uuid::Uuid::new_v4());
        let (status, _) = send(default_app(store), Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_uploads_over_two_megabytes_are_accepted() {
        let text = "handbook policy text ".repeat(150_000);
        assert!(text.len() > 3 * 1024 * 1024);
        let (status, body) = send(
            default_app(Arc::new(MemoryStore::new())),
            Method::POST,
            "/ingest/bulk",
            Some(json!({
                "files": [{ "filename": "handbook.txt", "content_b64": STANDARD.encode(&text) }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["jobId"].as_str().is_some());
    }

    #[tokio::test]
    async fn bodies_over_the_upload_limit_are_payload_too_large() {
        let content = "word ".repeat(1_000);
        let (status, body) = send(
            limited_app(Arc::new(MemoryStore::new()), 1024),
            Method::POST,
            "/ingest",
            Some(json!({ "title": "Big", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["kind"], "payload_too_large");

        let (status, _) = send(
            limited_app(Arc::new(MemoryStore::new()), 1024),
            Method::POST,
            "/ingest",
            Some(json!({ "title": "Small", "content": "short note", "tags": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_bulk_requests_are_rejected() {
        let (status, body) = send(
            default_app(Arc::new(MemoryStore::new())),
            Method::POST,
            "/ingest/bulk",
            Some(json!({ "files": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No files provided");
    }
}
