#![deny(missing_docs)]

//! Core library for semnotes: asynchronous note ingestion and retrieval by meaning.
//!
//! Notes are chunked, screened for secrets, embedded, and indexed by a bounded worker pool;
//! search and Q&A rank notes by their best-matching chunk.

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text generation client abstraction and adapters.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Queue and ingestion counters.
pub mod metrics;
/// Notes, chunks, jobs, and channel settings.
pub mod models;
/// Note lifecycle service.
pub mod notes;
/// Chunking, sensitive-content gate, ingestion pipeline, worker pool, summaries.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Semantic search and Q&A.
pub mod search;
/// Document store abstraction.
pub mod store;
/// Vector index abstraction.
pub mod vector;
