#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use semnotes::{
    embedding::{EmbeddingClient, EmbeddingClientError},
    generation::{GenerationClient, GenerationClientError},
    models::{ChannelSettings, Chunk, Note, NoteCategory, ProcessingJob},
    processing::{IngestionOutcome, JobProcessor, ProcessingError},
    store::{DocumentStore, MemoryDocumentStore, StoreError},
    vector::{VectorHit, VectorRecord, VectorStore, VectorStoreError},
};
use tokio::sync::Semaphore;
use uuid::Uuid;

pub const DIMENSION: usize = 4;

/// Returns the same unit vector for every text, failing for texts containing `FAIL`.
#[derive(Default)]
pub struct FlakyEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingClient for FlakyEmbedder {
    async fn generate(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(EmbeddingClientError::ProviderUnavailable(
                "scripted failure".into(),
            ));
        }
        Ok(vec![1.0, 0.0, 0.0, 0.0])
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Vector store that records writes and answers every search with scripted hits.
#[derive(Default)]
pub struct ScriptedVectorStore {
    pub hits: Mutex<Vec<VectorHit>>,
    pub upserts: Mutex<Vec<VectorRecord>>,
    pub deleted_notes: Mutex<Vec<Uuid>>,
    pub searched_top_k: Mutex<Vec<usize>>,
    pub fail_deletes: bool,
    pub fail_upsert_at: Option<usize>,
    pub upsert_attempts: AtomicUsize,
}

impl ScriptedVectorStore {
    pub fn with_hits(hits: Vec<VectorHit>) -> Self {
        Self {
            hits: Mutex::new(hits),
            ..Self::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// Fails the upsert attempt with the given zero-based position, accepting every other one.
    pub fn failing_upsert_at(attempt: usize) -> Self {
        Self {
            fail_upsert_at: Some(attempt),
            ..Self::default()
        }
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for ScriptedVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorStoreError> {
        let attempt = self.upsert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert_at == Some(attempt) {
            return Err(VectorStoreError::InvalidPayload("scripted failure".into()));
        }
        self.upserts.lock().unwrap().push(record);
        Ok(())
    }

    async fn search(
        &self,
        _vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, VectorStoreError> {
        self.searched_top_k.lock().unwrap().push(top_k);
        let mut hits = self.hits.lock().unwrap().clone();
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_by_note(&self, note_id: Uuid) -> Result<(), VectorStoreError> {
        if self.fail_deletes {
            return Err(VectorStoreError::InvalidPayload("scripted failure".into()));
        }
        self.deleted_notes.lock().unwrap().push(note_id);
        Ok(())
    }
}

/// Document store that refuses chunks containing `NOSTORE` and delegates everything else.
#[derive(Default)]
pub struct FlakyChunkStore {
    pub inner: MemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for FlakyChunkStore {
    async fn insert_note(&self, note: Note) -> Result<(), StoreError> {
        self.inner.insert_note(note).await
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.inner.get_note(id).await
    }

    async fn get_notes(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Note>, StoreError> {
        self.inner.get_notes(ids).await
    }

    async fn update_note(&self, note: Note) -> Result<(), StoreError> {
        self.inner.update_note(note).await
    }

    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_note(id).await
    }

    async fn find_note_by_source_url(
        &self,
        source_url: &str,
    ) -> Result<Option<Note>, StoreError> {
        self.inner.find_note_by_source_url(source_url).await
    }

    async fn list_notes_by_category(
        &self,
        category: &NoteCategory,
    ) -> Result<Vec<Note>, StoreError> {
        self.inner.list_notes_by_category(category).await
    }

    async fn insert_chunk(&self, chunk: Chunk) -> Result<(), StoreError> {
        if chunk.content.contains("NOSTORE") {
            return Err(StoreError::Unavailable("scripted failure".into()));
        }
        self.inner.insert_chunk(chunk).await
    }

    async fn chunks_for_note(&self, note_id: Uuid) -> Result<Vec<Chunk>, StoreError> {
        self.inner.chunks_for_note(note_id).await
    }

    async fn delete_chunks_for_note(&self, note_id: Uuid) -> Result<usize, StoreError> {
        self.inner.delete_chunks_for_note(note_id).await
    }

    async fn get_channel_settings(
        &self,
        channel: &str,
    ) -> Result<Option<ChannelSettings>, StoreError> {
        self.inner.get_channel_settings(channel).await
    }

    async fn upsert_channel_settings(&self, settings: ChannelSettings) -> Result<(), StoreError> {
        self.inner.upsert_channel_settings(settings).await
    }
}

/// Generation double that counts calls and remembers prompts.
pub struct RecordingGenerator {
    pub reply: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Generation double that always fails.
pub struct FailingGenerator;

#[async_trait]
impl GenerationClient for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationClientError> {
        Err(GenerationClientError::ProviderUnavailable("offline".into()))
    }
}

/// Job processor driven by the job title: `panic` panics, `fail` errors, anything else succeeds
/// once a permit is available on `gate`.
pub struct ScriptedProcessor {
    pub gate: Arc<Semaphore>,
    pub processed: AtomicUsize,
}

impl ScriptedProcessor {
    pub fn open() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
            processed: AtomicUsize::new(0),
        }
    }

    pub fn closed() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            processed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobProcessor for ScriptedProcessor {
    async fn process(&self, job: &ProcessingJob) -> Result<IngestionOutcome, ProcessingError> {
        let permit = self.gate.acquire().await.expect("gate open");
        permit.forget();
        self.processed.fetch_add(1, Ordering::SeqCst);
        match job.title.as_str() {
            "panic" => panic!("scripted panic"),
            "fail" => Err(ProcessingError::VectorStore(
                VectorStoreError::InvalidPayload("scripted".into()),
            )),
            _ => Ok(IngestionOutcome::Empty),
        }
    }
}

pub fn hit(note_id: Uuid, score: f32) -> VectorHit {
    VectorHit {
        chunk_id: Uuid::new_v4(),
        note_id,
        score,
    }
}

pub async fn store_with(notes: &[&Note]) -> Arc<MemoryDocumentStore> {
    let store = Arc::new(MemoryDocumentStore::new());
    for note in notes {
        store.insert_note((*note).clone()).await.expect("insert note");
    }
    store
}
