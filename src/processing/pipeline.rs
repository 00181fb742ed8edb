//! Ingestion pipeline: sensitive gate, truncation, chunking, and per-chunk embed/store.

use crate::{
    embedding::EmbeddingClient,
    metrics::PipelineMetrics,
    models::{Chunk, JobKind, ProcessingJob},
    processing::{
        chunking::{chunk_words, truncate_words},
        sensitive::matched_pattern,
        types::{IngestionOutcome, PipelineSettings, ProcessingError},
        worker::JobProcessor,
    },
    store::DocumentStore,
    vector::{VectorRecord, VectorStore},
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Turns a [`ProcessingJob`] snapshot into stored chunks and indexed vectors.
///
/// Collaborators are injected once and shared by every worker through an `Arc`.
pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

impl IngestionPipeline {
    /// Build a pipeline over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share a metrics registry with other components.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics registry this pipeline reports into.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one job to completion.
    ///
    /// Update jobs first drop whatever an earlier ingestion left behind, so a note edited to
    /// hold a secret loses its old chunks and vectors. Sensitive content is an `Ok` outcome
    /// that writes no chunks or vectors. A chunk whose persist, embed, or upsert step fails is
    /// logged and counted; the remaining chunks still run.
    pub async fn process(&self, job: &ProcessingJob) -> Result<IngestionOutcome, ProcessingError> {
        let text = format!("{}\n\n{}", job.title, job.content);

        if job.kind == JobKind::Update {
            self.purge_previous(job.note_id).await;
        }

        if let Some(pattern) = matched_pattern(&text) {
            tracing::warn!(
                job_id = %job.id,
                note_id = %job.note_id,
                pattern,
                "Sensitive content detected; skipping embedding"
            );
            self.metrics.record_sensitive_skip();
            return Ok(IngestionOutcome::SkippedSensitive);
        }

        let (embedded, truncated) = truncate_words(&text, self.settings.note_max_words);
        if truncated {
            tracing::debug!(
                note_id = %job.note_id,
                note_max_words = self.settings.note_max_words,
                "Note truncated before chunking"
            );
        }

        let chunks = chunk_words(embedded, self.settings.chunk_max_words)?;
        if chunks.is_empty() {
            tracing::debug!(job_id = %job.id, note_id = %job.note_id, "Note has no words to index");
            return Ok(IngestionOutcome::Empty);
        }

        let mut chunks_stored = 0usize;
        let mut chunks_failed = 0usize;
        for (index, content) in chunks.into_iter().enumerate() {
            let chunk = Chunk {
                id: Uuid::new_v4(),
                note_id: job.note_id,
                content,
                index,
            };
            let chunk_id = chunk.id;
            match self.index_chunk(chunk).await {
                Ok(()) => chunks_stored += 1,
                Err(error) => {
                    chunks_failed += 1;
                    tracing::warn!(
                        note_id = %job.note_id,
                        %chunk_id,
                        index,
                        error = %error,
                        "Chunk failed; continuing with remaining chunks"
                    );
                }
            }
        }

        self.metrics
            .record_note_indexed(chunks_stored as u64, chunks_failed as u64);
        tracing::info!(
            job_id = %job.id,
            note_id = %job.note_id,
            kind = ?job.kind,
            chunks_stored,
            chunks_failed,
            truncated,
            "Note indexed"
        );

        Ok(IngestionOutcome::Indexed {
            chunks_stored,
            chunks_failed,
            truncated,
        })
    }

    async fn index_chunk(&self, chunk: Chunk) -> Result<(), ProcessingError> {
        let chunk_id = chunk.id;
        let note_id = chunk.note_id;
        let content = chunk.content.clone();
        self.store.insert_chunk(chunk).await?;
        let vector = self.embedder.generate(&content).await?;
        self.vectors
            .upsert(VectorRecord {
                chunk_id,
                note_id,
                vector,
            })
            .await?;
        Ok(())
    }

    /// Drop vectors and chunks from an earlier ingestion of the same note.
    async fn purge_previous(&self, note_id: Uuid) {
        if let Err(error) = self.vectors.delete_by_note(note_id).await {
            tracing::warn!(%note_id, error = %error, "Failed to delete stale vectors");
        }
        match self.store.delete_chunks_for_note(note_id).await {
            Ok(removed) => {
                tracing::debug!(%note_id, removed, "Stale chunks removed before re-ingestion")
            }
            Err(error) => tracing::warn!(%note_id, error = %error, "Failed to delete stale chunks"),
        }
    }
}

#[async_trait]
impl JobProcessor for IngestionPipeline {
    async fn process(&self, job: &ProcessingJob) -> Result<IngestionOutcome, ProcessingError> {
        IngestionPipeline::process(self, job).await
    }
}
