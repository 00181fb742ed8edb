//! In-memory [`DocumentStore`] backed by `tokio::sync::RwLock`ed maps.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, StoreError};
use crate::models::{ChannelSettings, Chunk, Note, NoteCategory};

/// Process-local document store.
#[derive(Default)]
pub struct MemoryDocumentStore {
    notes: RwLock<HashMap<Uuid, Note>>,
    chunks: RwLock<HashMap<Uuid, Vec<Chunk>>>,
    channels: RwLock<HashMap<String, ChannelSettings>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notes.
    pub async fn note_count(&self) -> usize {
        self.notes.read().await.len()
    }

    /// Total number of stored chunks across all notes.
    pub async fn chunk_count(&self) -> usize {
        self.chunks.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_note(&self, note: Note) -> Result<(), StoreError> {
        let mut notes = self.notes.write().await;
        if notes.contains_key(&note.id) {
            return Err(StoreError::AlreadyExists {
                kind: "note",
                id: note.id.to_string(),
            });
        }
        notes.insert(note.id, note);
        Ok(())
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.notes.read().await.get(&id).cloned())
    }

    async fn get_notes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Note>, StoreError> {
        let notes = self.notes.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| notes.get(id).map(|note| (*id, note.clone())))
            .collect())
    }

    async fn update_note(&self, note: Note) -> Result<(), StoreError> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(&note.id) {
            Some(stored) => {
                *stored = note;
                Ok(())
            }
            None => Err(StoreError::note_not_found(note.id)),
        }
    }

    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        self.notes
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::note_not_found(id))
    }

    async fn find_note_by_source_url(
        &self,
        source_url: &str,
    ) -> Result<Option<Note>, StoreError> {
        let wanted = source_url.trim();
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .notes
            .read()
            .await
            .values()
            .find(|note| note.metadata.source_url() == Some(wanted))
            .cloned())
    }

    async fn list_notes_by_category(
        &self,
        category: &NoteCategory,
    ) -> Result<Vec<Note>, StoreError> {
        let mut matching: Vec<Note> = self
            .notes
            .read()
            .await
            .values()
            .filter(|note| &note.category == category)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn insert_chunk(&self, chunk: Chunk) -> Result<(), StoreError> {
        let mut chunks = self.chunks.write().await;
        let owned = chunks.entry(chunk.note_id).or_default();
        match owned.iter_mut().find(|stored| stored.id == chunk.id) {
            Some(stored) => *stored = chunk,
            None => owned.push(chunk),
        }
        Ok(())
    }

    async fn chunks_for_note(&self, note_id: Uuid) -> Result<Vec<Chunk>, StoreError> {
        let mut owned = self
            .chunks
            .read()
            .await
            .get(&note_id)
            .cloned()
            .unwrap_or_default();
        owned.sort_by_key(|chunk| chunk.index);
        Ok(owned)
    }

    async fn delete_chunks_for_note(&self, note_id: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .chunks
            .write()
            .await
            .remove(&note_id)
            .map(|removed| removed.len())
            .unwrap_or(0))
    }

    async fn get_channel_settings(
        &self,
        channel: &str,
    ) -> Result<Option<ChannelSettings>, StoreError> {
        Ok(self.channels.read().await.get(channel).cloned())
    }

    async fn upsert_channel_settings(&self, settings: ChannelSettings) -> Result<(), StoreError> {
        self.channels
            .write()
            .await
            .insert(settings.channel.clone(), settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{META_SOURCE_URL, NoteMetadata};
    use time::OffsetDateTime;

    fn chunk(note_id: Uuid, index: usize) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            note_id,
            content: format!("chunk {index}"),
            index,
        }
    }

    #[tokio::test]
    async fn get_notes_skips_missing_ids() {
        let store = MemoryDocumentStore::new();
        let note = Note::new("Kept", "body");
        store.insert_note(note.clone()).await.unwrap();

        let found = store.get_notes(&[note.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&note.id].title, "Kept");
    }

    #[tokio::test]
    async fn update_and_delete_missing_note_report_not_found() {
        let store = MemoryDocumentStore::new();
        let ghost = Note::new("Ghost", "");
        assert!(matches!(
            store.update_note(ghost.clone()).await,
            Err(StoreError::NotFound { kind: "note", .. })
        ));
        assert!(matches!(
            store.delete_note(ghost.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn finds_note_by_source_url() {
        let store = MemoryDocumentStore::new();
        let note = Note::new("Clip", "transcript").with_metadata(
            NoteMetadata::new().with(META_SOURCE_URL, "https://example.com/v/1"),
        );
        store.insert_note(note.clone()).await.unwrap();

        let found = store
            .find_note_by_source_url("https://example.com/v/1")
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.id), Some(note.id));
        assert!(store.find_note_by_source_url("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunks_come_back_in_index_order_and_delete_per_note() {
        let store = MemoryDocumentStore::new();
        let note_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert_chunk(chunk(note_id, 1)).await.unwrap();
        store.insert_chunk(chunk(note_id, 0)).await.unwrap();
        store.insert_chunk(chunk(other, 0)).await.unwrap();

        let owned = store.chunks_for_note(note_id).await.unwrap();
        assert_eq!(
            owned.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1]
        );

        assert_eq!(store.delete_chunks_for_note(note_id).await.unwrap(), 2);
        assert!(store.chunks_for_note(note_id).await.unwrap().is_empty());
        assert_eq!(store.chunk_count().await, 1);
    }

    #[tokio::test]
    async fn channel_settings_upsert_replaces_prompt() {
        let store = MemoryDocumentStore::new();
        for prompt in ["first", "second"] {
            store
                .upsert_channel_settings(ChannelSettings {
                    channel: "@chef".into(),
                    custom_prompt: Some(prompt.into()),
                    updated_at: OffsetDateTime::now_utc(),
                })
                .await
                .unwrap();
        }
        let settings = store.get_channel_settings("@chef").await.unwrap().unwrap();
        assert_eq!(settings.custom_prompt.as_deref(), Some("second"));
        assert!(store.get_channel_settings("@other").await.unwrap().is_none());
    }
}
