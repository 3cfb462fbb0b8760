#![deny(missing_docs)]

//! Core library for the Lexa AI retrieval service.

/// HTTP routing and REST handlers.
pub mod api;
/// Shared application state and startup wiring.
pub mod app;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document ingestion pipeline.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Candidate reranking.
pub mod rerank;
/// Document-chunk persistence.
pub mod store;
