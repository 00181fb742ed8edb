//! Vector index abstraction.
//!
//! Every stored vector carries its owning chunk id and note id as payload so a nearest-neighbor
//! hit maps straight back to a note without a join table.

pub mod memory;

use crate::qdrant::QdrantError;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryVectorStore;

/// Errors returned by vector index backends.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Qdrant transport or status failure.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// A stored point lacked the note/chunk payload tags.
    #[error("Vector payload missing or malformed: {0}")]
    InvalidPayload(String),
    /// Vector size does not match the index.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of vectors already in the index.
        expected: usize,
        /// Dimension of the rejected vector.
        actual: usize,
    },
}

/// Vector written for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Owning chunk; also the point id.
    pub chunk_id: Uuid,
    /// Owning note.
    pub note_id: Uuid,
    /// Embedding values.
    pub vector: Vec<f32>,
}

/// Nearest-neighbor match returned by [`VectorStore::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorHit {
    /// Chunk that matched.
    pub chunk_id: Uuid,
    /// Note owning the chunk.
    pub note_id: Uuid,
    /// Similarity to the query vector (cosine, higher is closer).
    pub score: f32,
}

/// Interface implemented by vector index backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the vector for a chunk.
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorStoreError>;

    /// Return up to `top_k` hits ordered by descending score.
    async fn search(&self, vector: &[f32], top_k: usize)
    -> Result<Vec<VectorHit>, VectorStoreError>;

    /// Remove every vector owned by `note_id`.
    async fn delete_by_note(&self, note_id: Uuid) -> Result<(), VectorStoreError>;
}
