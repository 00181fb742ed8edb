//! Core data types and error definitions for the ingestion pipeline.

use crate::{
    config::Config, embedding::EmbeddingClientError, store::StoreError, vector::VectorStoreError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while turning raw text into word-bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible word budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the ingestion pipeline.
///
/// Per-chunk failures are logged and counted inside [`IngestionOutcome::Indexed`]; only failures
/// that stop the whole job surface here.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Chunking step failed to segment the note.
    #[error("Failed to chunk note: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce a vector.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index rejected a write or delete.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Document store rejected a read or write.
    #[error("Document store request failed: {0}")]
    Store(#[from] StoreError),
}

/// Result of one ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestionOutcome {
    /// Chunks were produced and at least attempted.
    Indexed {
        /// Chunks persisted with a vector.
        chunks_stored: usize,
        /// Chunks skipped because a persist, embed, or upsert step failed.
        chunks_failed: usize,
        /// Whether the note exceeded the word cap before chunking.
        truncated: bool,
    },
    /// Sensitive content detected; nothing was written.
    SkippedSensitive,
    /// Title and content held no words.
    Empty,
}

impl IngestionOutcome {
    /// Whether at least one chunk is now searchable.
    pub fn is_searchable(&self) -> bool {
        matches!(self, Self::Indexed { chunks_stored, .. } if *chunks_stored > 0)
    }
}

/// Size limits applied by [`crate::processing::IngestionPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum words per chunk.
    pub chunk_max_words: usize,
    /// Maximum words of a note that are embedded.
    pub note_max_words: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_max_words: 200,
            note_max_words: 4000,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunk_max_words: config.chunk_max_words,
            note_max_words: config.note_max_words,
        }
    }
}
