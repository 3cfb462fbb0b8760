//! Core data types and error definitions for the ingestion pipeline.

use crate::{embedding::EmbeddingClientError, store::StoreError};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::extract::ExtractError;

/// Category applied when a document or file does not name one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Errors produced by an impossible chunking configuration.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Window of zero words.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would keep the window from advancing.
    #[error("chunk overlap {overlap} must be smaller than chunk size {window}")]
    OverlapTooLarge {
        /// Configured window.
        window: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Caller input failed validation.
    #[error("{0}")]
    Validation(String),
    /// File text could not be extracted.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Embedding provider failed or returned unusable vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Document store rejected the operation.
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable tag for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Extract(ExtractError::UnsupportedFormat(_)) => "unsupported_format",
            Self::Extract(ExtractError::ExtractionFailure { .. }) => "extraction_failure",
            Self::Embedding(_) => "provider_failure",
            Self::Storage(_) => "storage_unavailable",
        }
    }
}

/// A single document submitted for ingestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentInput {
    /// Document title; chunks are grouped and replaced by title.
    #[serde(default)]
    pub title: String,
    /// Full document text.
    #[serde(default)]
    pub content: String,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Optional tags; `null` reads as none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Uploading user.
    #[serde(default, rename = "userId")]
    pub owner: Option<String>,
    /// Original filename, set for documents that arrive as files.
    #[serde(skip)]
    pub source_file: Option<String>,
}

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    /// Always `true` for completed calls; failures surface as errors.
    pub success: bool,
    /// Whether the content matched an already stored document and was skipped.
    pub duplicate: bool,
    /// Title the chunks were stored under.
    pub title: String,
    /// Category the chunks were stored under.
    pub category: String,
    /// Number of chunks produced.
    pub chunks_created: usize,
    /// Number of vectors written to the store.
    pub total_vectors: usize,
}

/// File payload inside a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    /// Base64-encoded bytes.
    Base64(String),
    /// Text sent inline.
    Text(String),
    /// Neither form was supplied.
    Missing,
}

/// One file of a bulk ingestion request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFile {
    /// Original filename; its extension selects the extractor.
    #[serde(default)]
    pub filename: String,
    /// Base64 file bytes.
    #[serde(default)]
    pub content_b64: Option<String>,
    /// Inline text used when no base64 payload is present.
    #[serde(default)]
    pub content: Option<String>,
    /// Title override; defaults to the filename stem.
    #[serde(default)]
    pub title: Option<String>,
    /// Category override; defaults to [`DEFAULT_CATEGORY`].
    #[serde(default)]
    pub category: Option<String>,
    /// Tags applied to every chunk of the file; `null` reads as none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Uploading user; falls back to the request-level owner.
    #[serde(default, rename = "userId")]
    pub owner: Option<String>,
}

impl BulkFile {
    /// Which payload form the file carries, preferring base64.
    pub fn payload(&self) -> FileContent {
        if let Some(encoded) = self.content_b64.as_ref().filter(|value| !value.is_empty()) {
            FileContent::Base64(encoded.clone())
        } else if let Some(text) = self.content.as_ref() {
            FileContent::Text(text.clone())
        } else {
            FileContent::Missing
        }
    }

    /// Title to store the file under: the explicit title, else the filename stem.
    pub fn resolved_title(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                std::path::Path::new(&self.filename)
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or(&self.filename)
                    .to_string()
            })
    }
}

/// RFC3339 timestamp for the current instant.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file(value: serde_json::Value) -> BulkFile {
        serde_json::from_value(value).expect("bulk file")
    }

    #[test]
    fn bulk_file_prefers_base64_payload() {
        let both = file(json!({ "filename": "a.txt", "content_b64": "aGk=", "content": "hi" }));
        assert_eq!(both.payload(), FileContent::Base64("aGk=".into()));

        let inline = file(json!({ "filename": "a.txt", "content": "hi" }));
        assert_eq!(inline.payload(), FileContent::Text("hi".into()));

        let empty = file(json!({ "filename": "a.txt" }));
        assert_eq!(empty.payload(), FileContent::Missing);
    }

    #[test]
    fn null_tags_read_as_empty() {
        assert!(file(json!({ "filename": "a.txt", "tags": null })).tags.is_empty());
        assert_eq!(
            file(json!({ "filename": "a.txt", "tags": ["HR"] })).tags,
            vec!["HR".to_string()]
        );

        let document: DocumentInput =
            serde_json::from_value(json!({ "title": "T", "content": "hello world", "tags": null }))
                .expect("document");
        assert!(document.tags.is_empty());
    }

    #[test]
    fn title_defaults_to_filename_stem() {
        assert_eq!(
            file(json!({ "filename": "reports/q3-summary.pdf" })).resolved_title(),
            "q3-summary"
        );
        assert_eq!(
            file(json!({ "filename": "a.pdf", "title": "  Explicit " })).resolved_title(),
            "Explicit"
        );
        assert_eq!(
            file(json!({ "filename": "a.pdf", "title": "   " })).resolved_title(),
            "a"
        );
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(
            ServiceError::Validation("title is required".into()).kind(),
            "validation_error"
        );
        assert_eq!(
            ServiceError::from(ExtractError::UnsupportedFormat(".csv".into())).kind(),
            "unsupported_format"
        );
        assert_eq!(
            ServiceError::from(StoreError::Unavailable("down".into())).kind(),
            "storage_unavailable"
        );
        assert_eq!(
            ServiceError::from(EmbeddingClientError::GenerationFailed("x".into())).kind(),
            "provider_failure"
        );
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let stamp = current_timestamp_rfc3339();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }
}
