//! Semantic search: embed the query, fan out over chunk vectors, and rank notes.

use crate::{
    embedding::EmbeddingClient,
    models::ScoredNote,
    search::{
        SearchError, SearchSettings,
        ranking::{attach_notes, best_score_per_note, sort_by_score_desc},
    },
    store::DocumentStore,
    vector::VectorStore,
};
use std::sync::Arc;

/// Factor applied to `limit` when fetching chunk hits, since several chunks may share a note.
const FAN_OUT: usize = 2;

/// Ranks notes by their best-matching chunk.
pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    settings: SearchSettings,
}

impl SearchService {
    /// Build a search service over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            settings,
        }
    }

    /// Return up to `limit` notes ordered by descending relevance to `query`.
    ///
    /// A blank query, `limit == 0`, or no note clearing the relevance floor yields an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredNote>, SearchError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.generate(query).await?;
        let hits = self
            .vectors
            .search(&vector, limit.saturating_mul(FAN_OUT))
            .await?;

        let scores: Vec<_> = best_score_per_note(&hits)
            .into_iter()
            .filter(|(_, score)| *score >= self.settings.min_score)
            .collect();
        if scores.is_empty() {
            tracing::debug!(hits = hits.len(), "No notes above the relevance floor");
            return Ok(Vec::new());
        }

        let ids: Vec<_> = scores.iter().map(|(note_id, _)| *note_id).collect();
        let mut notes = self.store.get_notes(&ids).await?;
        let mut results = attach_notes(&scores, &mut notes);
        if results.len() < scores.len() {
            tracing::debug!(
                missing = scores.len() - results.len(),
                "Dropped hits for notes that no longer exist"
            );
        }

        sort_by_score_desc(&mut results);
        results.truncate(limit);
        tracing::info!(
            hits = hits.len(),
            results = results.len(),
            limit,
            "Search completed"
        );
        Ok(results)
    }
}
