//! Qdrant vector store integration.

pub mod client;
mod documents;
pub mod filters;
pub mod payload;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
pub mod types;

pub use client::QdrantService;
pub use filters::{first_chunk_checksum_filter, match_all_filter, title_filter};
pub use types::QdrantError;
