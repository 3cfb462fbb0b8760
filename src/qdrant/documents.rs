use super::{
    QdrantService, first_chunk_checksum_filter, scroller::PayloadScroll, title_filter,
};
use crate::store::{
    ChunkRecord, DocumentStore, DocumentSummary, StoreError, StoreStats, StoredChunk,
    compute_stats, summarize_documents,
};
use async_trait::async_trait;
use futures_util::{TryStreamExt, pin_mut};
use serde_json::Value;

/// Payload fields needed to rebuild [`StoredChunk`]s.
const SUMMARY_FIELDS: [&str; 8] = [
    "title",
    "content",
    "category",
    "tags",
    "chunk_index",
    "word_count",
    "model",
    "created_at",
];

impl QdrantService {
    async fn stored_chunks(&self) -> Result<Vec<StoredChunk>, StoreError> {
        let stream = PayloadScroll::new(self, &SUMMARY_FIELDS).into_stream();
        pin_mut!(stream);

        let mut chunks = Vec::new();
        while let Some(payload) = stream.try_next().await? {
            match serde_json::from_value::<StoredChunk>(Value::Object(payload)) {
                Ok(chunk) => chunks.push(chunk),
                Err(err) => {
                    tracing::warn!(collection = %self.collection, error = %err, "Skipping malformed chunk payload");
                }
            }
        }
        Ok(chunks)
    }
}

#[async_trait]
impl DocumentStore for QdrantService {
    async fn ping(&self) -> Result<(), StoreError> {
        if self.collection_exists().await? {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "collection '{}' does not exist",
                self.collection
            )))
        }
    }

    async fn checksum_exists(&self, checksum: &str) -> Result<bool, StoreError> {
        let matches = self
            .count_points(Some(first_chunk_checksum_filter(checksum)))
            .await?;
        Ok(matches > 0)
    }

    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<usize, StoreError> {
        Ok(self.upsert_points(records).await?)
    }

    async fn delete_by_title(&self, title: &str) -> Result<u64, StoreError> {
        let existing = self.count_points(Some(title_filter(title))).await?;
        if existing == 0 {
            return Ok(0);
        }
        self.delete_points(title_filter(title)).await?;
        tracing::info!(collection = %self.collection, title, removed = existing, "Deleted document chunks");
        Ok(existing)
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let existing = self.count_points(None).await?;
        self.drop_collection().await?;
        self.ensure_ready().await?;
        tracing::info!(collection = %self.collection, removed = existing, "Collection cleared");
        Ok(existing)
    }

    async fn list_documents(&self, limit: usize) -> Result<Vec<DocumentSummary>, StoreError> {
        let chunks = self.stored_chunks().await?;
        Ok(summarize_documents(chunks, limit))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let chunks = self.stored_chunks().await?;
        Ok(compute_stats(chunks))
    }
}
