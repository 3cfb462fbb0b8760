//! Document-chunk persistence seam.
//!
//! The ingestion pipeline talks to storage only through [`DocumentStore`]. Qdrant is the
//! production backend ([`crate::qdrant::QdrantService`]); [`MemoryStore`] keeps records in
//! process for local runs and tests.

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

mod memory;

pub use memory::MemoryStore;

/// Number of characters kept in document previews.
const PREVIEW_CHARS: usize = 200;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Qdrant transport or status failure.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Backend refused the operation because it is not reachable.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// One persisted chunk of a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Document title shared by every chunk of the document.
    pub title: String,
    /// Text span covered by this chunk.
    pub content: String,
    /// Free-form category label.
    pub category: String,
    /// Normalized tag set.
    pub tags: Vec<String>,
    /// Ordinal of the chunk within its document, starting at 0.
    pub chunk_index: usize,
    /// Number of chunks produced for the document.
    pub total_chunks: usize,
    /// Whitespace word count of `content`.
    pub word_count: usize,
    /// Embedding vector for `content`.
    pub embedding: Vec<f32>,
    /// Content checksum of the whole document; present on chunk 0 only.
    pub checksum: Option<String>,
    /// Original filename for uploaded files.
    pub source_file: Option<String>,
    /// Identifier of the uploading user, when known.
    pub uploaded_by: Option<String>,
    /// Embedding model that produced `embedding`.
    pub model: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

/// Chunk fields needed to summarize stored documents, independent of the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredChunk {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Chunk text.
    #[serde(default)]
    pub content: String,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Tags attached to the chunk.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ordinal within the document.
    #[serde(default)]
    pub chunk_index: usize,
    /// Words in the chunk.
    #[serde(default)]
    pub word_count: usize,
    /// Embedding model tag.
    #[serde(default)]
    pub model: Option<String>,
    /// RFC3339 creation timestamp.
    #[serde(default)]
    pub created_at: String,
}

impl From<&ChunkRecord> for StoredChunk {
    fn from(record: &ChunkRecord) -> Self {
        Self {
            title: record.title.clone(),
            content: record.content.clone(),
            category: record.category.clone(),
            tags: record.tags.clone(),
            chunk_index: record.chunk_index,
            word_count: record.word_count,
            model: Some(record.model.clone()),
            created_at: record.created_at.clone(),
        }
    }
}

/// Per-title aggregate returned by document listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Document title.
    pub title: String,
    /// Category of the first chunk.
    pub category: String,
    /// Tags of the first chunk.
    pub tags: Vec<String>,
    /// Number of stored chunks.
    pub chunks: usize,
    /// Leading characters of the first chunk.
    pub preview: String,
    /// Sum of chunk word counts (overlapping words are counted per chunk).
    pub total_words: usize,
    /// Embedding model tag, when recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Earliest chunk timestamp of the document.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_at: String,
}

/// Collection-wide counters.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of stored chunk records.
    pub total_chunks: usize,
    /// Number of distinct titles.
    pub total_documents: usize,
    /// Distinct non-empty categories, sorted.
    pub categories: Vec<String>,
    /// Length of `categories`.
    pub categories_count: usize,
}

/// Storage operations required by the ingestion pipeline and the HTTP surface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Whether a first-chunk record carries `checksum`.
    async fn checksum_exists(&self, checksum: &str) -> Result<bool, StoreError>;

    /// Persist `records` as one batch write, returning the number written.
    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<usize, StoreError>;

    /// Remove every chunk with the given title, returning the number removed.
    async fn delete_by_title(&self, title: &str) -> Result<u64, StoreError>;

    /// Remove every chunk, returning the number removed.
    async fn clear(&self) -> Result<u64, StoreError>;

    /// Summaries grouped by title, newest first, capped at `limit`.
    async fn list_documents(&self, limit: usize) -> Result<Vec<DocumentSummary>, StoreError>;

    /// Collection-wide counters.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok()
}

/// Group chunks by title into document summaries, newest first.
///
/// Documents are ordered by their earliest chunk timestamp, descending; ties and unparseable
/// timestamps fall back to title order, with undated documents last.
pub fn summarize_documents<I>(chunks: I, limit: usize) -> Vec<DocumentSummary>
where
    I: IntoIterator<Item = StoredChunk>,
{
    let mut grouped: BTreeMap<String, (usize, DocumentSummary)> = BTreeMap::new();

    for chunk in chunks {
        let entry = grouped.entry(chunk.title.clone()).or_insert_with(|| {
            (
                usize::MAX,
                DocumentSummary {
                    title: chunk.title.clone(),
                    category: String::new(),
                    tags: Vec::new(),
                    chunks: 0,
                    preview: String::new(),
                    total_words: 0,
                    model: None,
                    created_at: String::new(),
                },
            )
        });
        let (lowest_index, summary) = entry;
        summary.chunks += 1;
        summary.total_words += chunk.word_count;
        if let Some(stamp) = parse_timestamp(&chunk.created_at) {
            if parse_timestamp(&summary.created_at).is_none_or(|current| stamp < current) {
                summary.created_at = chunk.created_at.clone();
            }
        }
        if chunk.chunk_index < *lowest_index {
            *lowest_index = chunk.chunk_index;
            summary.category = chunk.category;
            summary.tags = chunk.tags;
            summary.preview = chunk.content.chars().take(PREVIEW_CHARS).collect();
            summary.model = chunk.model;
        }
    }

    let mut summaries: Vec<DocumentSummary> =
        grouped.into_values().map(|(_, summary)| summary).collect();
    summaries
        .sort_by_cached_key(|summary| std::cmp::Reverse(parse_timestamp(&summary.created_at)));
    summaries.truncate(limit);
    summaries
}

/// Compute collection counters from stored chunks.
pub fn compute_stats<I>(chunks: I) -> StoreStats
where
    I: IntoIterator<Item = StoredChunk>,
{
    let mut total_chunks = 0;
    let mut titles = BTreeSet::new();
    let mut categories = BTreeSet::new();

    for chunk in chunks {
        total_chunks += 1;
        titles.insert(chunk.title);
        let category = chunk.category.trim();
        if !category.is_empty() {
            categories.insert(category.to_string());
        }
    }

    let categories: Vec<String> = categories.into_iter().collect();
    StoreStats {
        total_chunks,
        total_documents: titles.len(),
        categories_count: categories.len(),
        categories,
    }
}
