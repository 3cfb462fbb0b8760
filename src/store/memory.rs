use super::{
    ChunkRecord, DocumentStore, DocumentSummary, StoreError, StoreStats, StoredChunk,
    compute_stats, summarize_documents,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Process-local [`DocumentStore`]; contents vanish on restart.
pub struct MemoryStore {
    records: RwLock<Vec<ChunkRecord>>,
    available: AtomicBool,
}

impl MemoryStore {
    /// Create an empty, reachable store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle reachability; while unavailable every operation fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Copy of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<ChunkRecord> {
        self.records.read().await.clone()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".into()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }

    async fn checksum_exists(&self, checksum: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        Ok(records.iter().any(|record| {
            record.chunk_index == 0 && record.checksum.as_deref() == Some(checksum)
        }))
    }

    async fn insert_chunks(&self, records: Vec<ChunkRecord>) -> Result<usize, StoreError> {
        self.ensure_available()?;
        let count = records.len();
        self.records.write().await.extend(records);
        Ok(count)
    }

    async fn delete_by_title(&self, title: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.title != title);
        Ok((before - records.len()) as u64)
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn list_documents(&self, limit: usize) -> Result<Vec<DocumentSummary>, StoreError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        Ok(summarize_documents(
            records.iter().map(StoredChunk::from),
            limit,
        ))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        Ok(compute_stats(records.iter().map(StoredChunk::from)))
    }
}
