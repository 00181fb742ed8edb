//! Semantic search over indexed notes and the Q&A flow built on top of it.

pub mod qa;
pub mod ranking;
pub mod service;

use crate::{
    config::Config, embedding::EmbeddingClientError, generation::GenerationClientError,
    store::StoreError, vector::VectorStoreError,
};
use thiserror::Error;

pub use qa::{Answer, GENERATION_UNAVAILABLE, NO_RELEVANT_INFORMATION, QaService};
pub use service::SearchService;

/// Errors emitted while searching or answering questions.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index query failed.
    #[error("Vector search failed: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Note lookup failed.
    #[error("Document store request failed: {0}")]
    Store(#[from] StoreError),
    /// Generation provider failed while answering.
    #[error("Answer generation failed: {0}")]
    Generation(#[from] GenerationClientError),
}

/// Relevance floor for search results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Notes whose best chunk scores below this are dropped.
    pub min_score: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { min_score: 0.3 }
    }
}

impl From<&Config> for SearchSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_score: config.search_min_score,
        }
    }
}

/// Retrieval limits for Q&A context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QaSettings {
    /// Nearest chunk vectors fetched per question.
    pub top_k: usize,
    /// Chunks scoring below this never become context.
    pub min_score: f32,
    /// Words of each source note placed in the context block.
    pub context_max_words: usize,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.4,
            context_max_words: 4000,
        }
    }
}

impl From<&Config> for QaSettings {
    fn from(config: &Config) -> Self {
        Self {
            top_k: config.qa_top_k,
            min_score: config.qa_min_score,
            context_max_words: config.note_max_words,
        }
    }
}
