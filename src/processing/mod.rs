//! Document ingestion pipeline: extraction, chunking, deduplication, embedding, and job tracking.

mod bulk;
pub mod chunking;
pub mod dedup;
pub mod extract;
pub mod jobs;
pub mod sanitize;
mod service;
pub mod types;

pub use bulk::{BulkAccepted, run_bulk_job, start_bulk_ingest};
pub use chunking::{ChunkingPolicy, chunk_words};
pub use extract::{ExtractError, extract_text};
pub use jobs::{JobRegistry, JobSnapshot, JobStatus};
pub use service::IngestionService;
pub use types::{
    BulkFile, ChunkingError, DocumentInput, FileContent, IngestOutcome, ServiceError,
};
