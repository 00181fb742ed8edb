//! Document store abstraction for notes, chunks, and channel settings.
//!
//! The storage engine is an external collaborator; services only depend on [`DocumentStore`].
//! [`MemoryDocumentStore`] backs the CLI and the tests.

pub mod memory;

use crate::models::{ChannelSettings, Chunk, Note, NoteCategory};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryDocumentStore;

/// Errors returned by document store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given identifier exists.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record family (`note`, `channel settings`, ...).
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// A record with the same identifier already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Record family.
        kind: &'static str,
        /// Conflicting identifier.
        id: String,
    },
    /// Backend could not be reached or rejected the request.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn note_not_found(id: Uuid) -> Self {
        Self::NotFound {
            kind: "note",
            id: id.to_string(),
        }
    }
}

/// Narrow repository interface over the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new note.
    async fn insert_note(&self, note: Note) -> Result<(), StoreError>;

    /// Fetch one note, `None` when absent.
    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError>;

    /// Batch fetch; identifiers without a note are absent from the map.
    async fn get_notes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Note>, StoreError>;

    /// Replace an existing note.
    async fn update_note(&self, note: Note) -> Result<(), StoreError>;

    /// Remove a note record.
    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError>;

    /// Find the note captured from `source_url`, if any.
    async fn find_note_by_source_url(&self, source_url: &str)
    -> Result<Option<Note>, StoreError>;

    /// Notes with the given category, newest first.
    async fn list_notes_by_category(
        &self,
        category: &NoteCategory,
    ) -> Result<Vec<Note>, StoreError>;

    /// Persist a chunk.
    async fn insert_chunk(&self, chunk: Chunk) -> Result<(), StoreError>;

    /// Chunks owned by a note, ordered by index.
    async fn chunks_for_note(&self, note_id: Uuid) -> Result<Vec<Chunk>, StoreError>;

    /// Remove every chunk owned by a note, returning how many were removed.
    async fn delete_chunks_for_note(&self, note_id: Uuid) -> Result<usize, StoreError>;

    /// Settings for a channel key, `None` when never upserted.
    async fn get_channel_settings(
        &self,
        channel: &str,
    ) -> Result<Option<ChannelSettings>, StoreError>;

    /// Create or replace settings for a channel key.
    async fn upsert_channel_settings(&self, settings: ChannelSettings) -> Result<(), StoreError>;
}
