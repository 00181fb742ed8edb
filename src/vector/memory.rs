//! In-memory [`VectorStore`] used when no Qdrant URL is configured and in tests.
//!
//! Search is a brute-force cosine scan over every stored vector.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{VectorHit, VectorRecord, VectorStore, VectorStoreError};

/// Brute-force vector index held in process memory.
#[derive(Default)]
pub struct MemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryVectorStore {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the index holds no vectors.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Number of vectors owned by `note_id`.
    pub async fn count_for_note(&self, note_id: Uuid) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.note_id == note_id)
            .count()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), VectorStoreError> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.first()
            && existing.vector.len() != record.vector.len()
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected: existing.vector.len(),
                actual: record.vector.len(),
            });
        }
        match records
            .iter_mut()
            .find(|stored| stored.chunk_id == record.chunk_id)
        {
            Some(stored) => *stored = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, VectorStoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let records = self.records.read().await;
        let mut hits: Vec<VectorHit> = records
            .iter()
            .map(|record| VectorHit {
                chunk_id: record.chunk_id,
                note_id: record.note_id,
                score: cosine_similarity(vector, &record.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_by_note(&self, note_id: Uuid) -> Result<(), VectorStoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.note_id != note_id);
        tracing::debug!(%note_id, removed = before - records.len(), "Deleted note vectors");
        Ok(())
    }
}
