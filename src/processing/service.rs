//! Ingestion service coordinating chunking, embedding, and store writes.

use crate::{
    embedding::{EmbeddingClient, EmbeddingClientError, validate_embeddings},
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        chunking::{ChunkingPolicy, word_count},
        dedup::{checksum, is_duplicate},
        extract::{ExtractError, extract_text},
        sanitize::{sanitize_category, sanitize_string, sanitize_tags},
        types::{
            BulkFile, DocumentInput, FileContent, IngestOutcome, ServiceError,
            current_timestamp_rfc3339,
        },
    },
    store::{ChunkRecord, DocumentStore},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::sync::Arc;

/// Metadata shared by every chunk of one document.
struct DocumentMeta {
    title: String,
    category: String,
    tags: Vec<String>,
    source_file: Option<String>,
    uploaded_by: Option<String>,
}

/// Coordinates the ingestion pipeline: word-window chunking, batch embedding, and store writes.
///
/// The service owns long-lived handles to the embedding client, the document store, and the
/// metrics registry so that the HTTP handlers and the bulk drivers reuse the same components.
/// Construct it once near process start and share it through an `Arc`.
pub struct IngestionService {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn DocumentStore>,
    policy: ChunkingPolicy,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Assemble the service from its collaborators.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn DocumentStore>,
        policy: ChunkingPolicy,
    ) -> Self {
        Self {
            embedder,
            store,
            policy,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Backing document store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Model tag of the embedding backend.
    pub fn model(&self) -> &str {
        self.embedder.model()
    }

    /// Vector length of the embedding backend.
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Shared metrics registry.
    pub fn metrics(&self) -> &Arc<IngestMetrics> {
        &self.metrics
    }

    /// Current ingestion counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Embed a single non-blank text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::Validation("Text cannot be empty".into()));
        }
        let mut vectors = self.embedder.generate_embeddings(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            ServiceError::Embedding(EmbeddingClientError::InvalidResponse(
                "provider returned no vectors".into(),
            ))
        })
    }

    /// Embed texts in order with one provider call; an empty list yields no vectors.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.embedder.generate_embeddings(texts).await?)
    }

    /// Ingest one document, replacing any earlier chunks stored under the same title.
    ///
    /// Content whose checksum is already stored is reported as a duplicate and leaves the
    /// store untouched.
    pub async fn ingest_document(
        &self,
        input: DocumentInput,
    ) -> Result<IngestOutcome, ServiceError> {
        let title = input.title.trim();
        if title.is_empty() || input.content.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Title and content required".into(),
            ));
        }

        let meta = DocumentMeta {
            title: title.to_string(),
            category: sanitize_category(input.category.as_deref()),
            tags: sanitize_tags(&input.tags),
            source_file: input.source_file.clone(),
            uploaded_by: sanitize_string(input.owner.as_deref()),
        };

        let digest = checksum(&input.content);
        if is_duplicate(self.store.as_ref(), &digest).await? {
            tracing::info!(title = %meta.title, "Document already stored; skipping");
            self.metrics.record_duplicate();
            return Ok(duplicate_outcome(meta));
        }

        let records = self.build_records(&meta, &input.content, &digest).await?;
        let removed = self.store.delete_by_title(&meta.title).await?;
        if removed > 0 {
            tracing::debug!(title = %meta.title, removed, "Replaced earlier chunks");
        }
        self.persist(meta, records).await
    }

    /// Ingest one bulk file. Duplicates are skipped by checksum; titles are never replaced.
    pub async fn ingest_file(
        &self,
        file: &BulkFile,
        default_owner: Option<&str>,
    ) -> Result<IngestOutcome, ServiceError> {
        let text = decode_file(file).await?;
        let meta = DocumentMeta {
            title: file.resolved_title(),
            category: sanitize_category(file.category.as_deref()),
            tags: sanitize_tags(&file.tags),
            source_file: sanitize_string(Some(file.filename.as_str())),
            uploaded_by: sanitize_string(file.owner.as_deref())
                .or_else(|| sanitize_string(default_owner)),
        };

        let digest = checksum(&text);
        if is_duplicate(self.store.as_ref(), &digest).await? {
            tracing::info!(filename = %file.filename, "Skipping duplicate file");
            self.metrics.record_duplicate();
            return Ok(duplicate_outcome(meta));
        }

        let records = self.build_records(&meta, &text, &digest).await?;
        self.persist(meta, records).await
    }

    async fn build_records(
        &self,
        meta: &DocumentMeta,
        text: &str,
        digest: &str,
    ) -> Result<Vec<ChunkRecord>, ServiceError> {
        let chunks = self.policy.chunk(text);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.generate_embeddings(chunks.clone()).await?;
        validate_embeddings(&embeddings, chunks.len(), self.embedder.dimension())?;
        let total_chunks = chunks.len();
        let created_at = current_timestamp_rfc3339();
        let model = self.embedder.model().to_string();

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (content, embedding))| ChunkRecord {
                title: meta.title.clone(),
                word_count: word_count(&content),
                content,
                category: meta.category.clone(),
                tags: meta.tags.clone(),
                chunk_index,
                total_chunks,
                embedding,
                checksum: (chunk_index == 0).then(|| digest.to_string()),
                source_file: meta.source_file.clone(),
                uploaded_by: meta.uploaded_by.clone(),
                model: model.clone(),
                created_at: created_at.clone(),
            })
            .collect())
    }

    async fn persist(
        &self,
        meta: DocumentMeta,
        records: Vec<ChunkRecord>,
    ) -> Result<IngestOutcome, ServiceError> {
        let chunks_created = records.len();
        let total_vectors = if records.is_empty() {
            0
        } else {
            self.store.insert_chunks(records).await?
        };

        self.metrics.record_document(total_vectors as u64);
        tracing::info!(
            title = %meta.title,
            category = %meta.category,
            chunks = chunks_created,
            "Document ingested"
        );

        Ok(IngestOutcome {
            success: true,
            duplicate: false,
            title: meta.title,
            category: meta.category,
            chunks_created,
            total_vectors,
        })
    }
}

fn duplicate_outcome(meta: DocumentMeta) -> IngestOutcome {
    IngestOutcome {
        success: true,
        duplicate: true,
        title: meta.title,
        category: meta.category,
        chunks_created: 0,
        total_vectors: 0,
    }
}

/// Decode a bulk file payload into extracted text.
async fn decode_file(file: &BulkFile) -> Result<String, ServiceError> {
    let bytes = match file.payload() {
        FileContent::Base64(encoded) => STANDARD
            .decode(encoded.trim())
            .map_err(|err| ServiceError::Validation(format!("Invalid base64 content: {err}")))?,
        FileContent::Text(text) => text.into_bytes(),
        FileContent::Missing => {
            return Err(ServiceError::Validation("File content is missing".into()));
        }
    };

    let filename = file.filename.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, &filename))
        .await
        .map_err(|err| ExtractError::ExtractionFailure {
            format: "file",
            cause: err.to_string(),
        })??;
    Ok(text)
}
