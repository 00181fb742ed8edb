//! Note lifecycle: create, update, and delete with ingestion and cascade cleanup.

use crate::{
    models::{JobKind, Note, NoteCategory, NoteMetadata, ProcessingJob},
    processing::WorkerPool,
    store::{DocumentStore, StoreError},
    vector::VectorStore,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Errors returned by [`NoteService`].
#[derive(Debug, Error)]
pub enum NoteServiceError {
    /// Another note was already captured from the same URL.
    #[error("A note for {source_url} already exists ({existing})")]
    Duplicate {
        /// Conflicting source URL.
        source_url: String,
        /// Identifier of the note that owns it.
        existing: Uuid,
    },
    /// No note with this identifier.
    #[error("Note not found: {0}")]
    NotFound(Uuid),
    /// Document store failure.
    #[error("Document store request failed: {0}")]
    Store(#[from] StoreError),
}

/// Fields supplied when saving a new note.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    /// Short title.
    pub title: String,
    /// Raw text.
    pub content: String,
    /// Source label.
    pub category: NoteCategory,
    /// Platform, author/channel, source URL, capture time.
    pub metadata: NoteMetadata,
    /// Optional semi-structured payload from the source.
    pub structured_data: Option<serde_json::Value>,
    /// Publication time of the captured source.
    pub published_at: Option<OffsetDateTime>,
}

/// Partial edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement content.
    pub content: Option<String>,
    /// Replacement category.
    pub category: Option<NoteCategory>,
    /// Replacement metadata map.
    pub metadata: Option<NoteMetadata>,
}

/// A saved note and whether its ingestion job made it into the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedNote {
    /// The stored note.
    pub note: Note,
    /// `false` when the queue was saturated; the note is saved but not yet searchable.
    pub queued: bool,
}

/// An edited note and whether re-ingestion was queued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedNote {
    /// The stored note.
    pub note: Note,
    /// `true` when title or content changed and the update job was accepted.
    pub reindex_queued: bool,
}

/// Glue between the note records, the worker pool, and the vector index.
pub struct NoteService {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    pool: Arc<WorkerPool>,
}

impl NoteService {
    /// Build a note service sharing an already constructed worker pool.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            store,
            vectors,
            pool,
        }
    }

    /// Save a note and queue it for ingestion.
    ///
    /// A full queue is not an error: the note is stored and `queued` is `false`.
    pub async fn create_note(&self, new_note: NewNote) -> Result<CreatedNote, NoteServiceError> {
        if let Some(source_url) = new_note.metadata.source_url() {
            self.ensure_unique_source(source_url, None).await?;
        }

        let mut note = Note::new(new_note.title.trim(), new_note.content)
            .with_category(new_note.category)
            .with_metadata(new_note.metadata);
        note.structured_data = new_note.structured_data;
        note.published_at = new_note.published_at;

        self.store.insert_note(note.clone()).await?;
        let queued = self
            .pool
            .submit(ProcessingJob::from_note(&note, JobKind::Create));
        if queued {
            tracing::info!(note_id = %note.id, category = note.category.as_str(), "Note created");
        } else {
            tracing::warn!(note_id = %note.id, "Note created but ingestion queue is saturated");
        }

        Ok(CreatedNote { note, queued })
    }

    /// Fetch one note.
    pub async fn get_note(&self, id: Uuid) -> Result<Note, NoteServiceError> {
        self.store
            .get_note(id)
            .await?
            .ok_or(NoteServiceError::NotFound(id))
    }

    /// Notes with the given category, newest first.
    pub async fn list_by_category(
        &self,
        category: &NoteCategory,
    ) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.store.list_notes_by_category(category).await?)
    }

    /// Apply an edit; title or content changes queue a re-ingestion.
    pub async fn update_note(
        &self,
        id: Uuid,
        update: NoteUpdate,
    ) -> Result<UpdatedNote, NoteServiceError> {
        let mut note = self.get_note(id).await?;

        if let Some(metadata) = update.metadata {
            if let Some(source_url) = metadata.source_url()
                && note.metadata.source_url() != Some(source_url)
            {
                self.ensure_unique_source(source_url, Some(id)).await?;
            }
            note.metadata = metadata;
        }
        if let Some(category) = update.category {
            note.category = category;
        }

        let mut text_changed = false;
        if let Some(title) = update.title {
            let title = title.trim().to_string();
            text_changed |= title != note.title;
            note.title = title;
        }
        if let Some(content) = update.content {
            text_changed |= content != note.content;
            note.content = content;
        }

        self.store.update_note(note.clone()).await.map_err(|error| match error {
            StoreError::NotFound { .. } => NoteServiceError::NotFound(id),
            other => NoteServiceError::Store(other),
        })?;

        let reindex_queued =
            text_changed && self.pool.submit(ProcessingJob::from_note(&note, JobKind::Update));
        if text_changed && !reindex_queued {
            tracing::warn!(note_id = %id, "Note updated but re-ingestion could not be queued");
        }
        tracing::info!(note_id = %id, text_changed, reindex_queued, "Note updated");

        Ok(UpdatedNote {
            note,
            reindex_queued,
        })
    }

    /// Delete a note with its vectors and chunks.
    ///
    /// Vector and chunk cleanup are best-effort and only logged on failure; removing the note
    /// record itself must succeed.
    pub async fn delete_note(&self, id: Uuid) -> Result<(), NoteServiceError> {
        if let Err(error) = self.vectors.delete_by_note(id).await {
            tracing::warn!(note_id = %id, error = %error, "Failed to delete note vectors");
        }
        match self.store.delete_chunks_for_note(id).await {
            Ok(removed) => tracing::debug!(note_id = %id, removed, "Note chunks deleted"),
            Err(error) => {
                tracing::warn!(note_id = %id, error = %error, "Failed to delete note chunks")
            }
        }

        self.store.delete_note(id).await.map_err(|error| match error {
            StoreError::NotFound { .. } => NoteServiceError::NotFound(id),
            other => NoteServiceError::Store(other),
        })?;
        tracing::info!(note_id = %id, "Note deleted");
        Ok(())
    }

    async fn ensure_unique_source(
        &self,
        source_url: &str,
        owner: Option<Uuid>,
    ) -> Result<(), NoteServiceError> {
        match self.store.find_note_by_source_url(source_url).await? {
            Some(existing) if Some(existing.id) != owner => Err(NoteServiceError::Duplicate {
                source_url: source_url.to_string(),
                existing: existing.id,
            }),
            _ => Ok(()),
        }
    }
}
