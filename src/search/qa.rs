//! Question answering over the most relevant notes.

use crate::{
    embedding::EmbeddingClient,
    generation::GenerationClient,
    models::ScoredNote,
    processing::chunking::truncate_words,
    search::{
        QaSettings, SearchError,
        ranking::{attach_notes, first_hit_per_note},
    },
    store::DocumentStore,
    vector::VectorStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Answer returned when no note is relevant enough to use as context.
pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find any information in your notes that answers this question.";

/// Answer returned when sources were found but no generation provider is configured.
pub const GENERATION_UNAVAILABLE: &str =
    "Answer generation is not configured. The most relevant notes are listed as sources.";

/// Generated answer with the notes it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Answer text.
    pub answer: String,
    /// Notes used as context, best first.
    pub sources: Vec<ScoredNote>,
}

impl Answer {
    fn canned(text: &str, sources: Vec<ScoredNote>) -> Self {
        Self {
            answer: text.to_string(),
            sources,
        }
    }
}

/// Retrieves a small, strictly filtered context and asks the generation provider.
pub struct QaService {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    generator: Option<Arc<dyn GenerationClient>>,
    settings: QaSettings,
}

impl QaService {
    /// Build a Q&A service; `generator == None` returns sources with a canned answer.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Option<Arc<dyn GenerationClient>>,
        settings: QaSettings,
    ) -> Self {
        Self {
            store,
            vectors,
            embedder,
            generator,
            settings,
        }
    }

    /// Answer `question` from the user's notes.
    ///
    /// The generation provider is never called when no note survives the relevance floor.
    pub async fn answer(&self, question: &str) -> Result<Answer, SearchError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(Answer::canned(NO_RELEVANT_INFORMATION, Vec::new()));
        }

        let vector = self.embedder.generate(question).await?;
        let hits = self.vectors.search(&vector, self.settings.top_k).await?;
        let relevant: Vec<_> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.settings.min_score)
            .collect();
        let scores = first_hit_per_note(&relevant);

        let sources = if scores.is_empty() {
            Vec::new()
        } else {
            let ids: Vec<_> = scores.iter().map(|(note_id, _)| *note_id).collect();
            let mut notes = self.store.get_notes(&ids).await?;
            attach_notes(&scores, &mut notes)
        };

        if sources.is_empty() {
            tracing::info!("No relevant notes for question; skipping generation");
            return Ok(Answer::canned(NO_RELEVANT_INFORMATION, Vec::new()));
        }

        let Some(generator) = self.generator.as_ref() else {
            tracing::info!(
                sources = sources.len(),
                "Generation disabled; returning sources only"
            );
            return Ok(Answer::canned(GENERATION_UNAVAILABLE, sources));
        };

        let context = build_context(&sources, self.settings.context_max_words);
        let prompt = build_prompt(question, &context);
        let answer = generator.generate(&prompt).await?;
        tracing::info!(sources = sources.len(), "Question answered");

        Ok(Answer {
            answer: answer.trim().to_string(),
            sources,
        })
    }
}

/// Concatenate source notes into a delimited context block.
pub(crate) fn build_context(sources: &[ScoredNote], max_words_per_note: usize) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let (content, _) = truncate_words(source.note.content.trim(), max_words_per_note);
            format!(
                "### Note {}: {}\n{}",
                index + 1,
                source.note.title.trim(),
                content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You answer questions using only the notes below. If the notes do not contain the answer, say so briefly.\n\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;

    #[test]
    fn context_separates_notes_with_headers() {
        let sources = vec![
            ScoredNote {
                note: Note::new("Ramen", "Simmer the broth."),
                score: 0.8,
            },
            ScoredNote {
                note: Note::new("Udon", "Knead the dough."),
                score: 0.6,
            },
        ];
        let context = build_context(&sources, 100);
        assert_eq!(
            context,
            "### Note 1: Ramen\nSimmer the broth.\n\n---\n\n### Note 2: Udon\nKnead the dough."
        );
    }

    #[test]
    fn context_caps_each_note() {
        let sources = vec![ScoredNote {
            note: Note::new("Long", "a b c d e f"),
            score: 0.9,
        }];
        assert_eq!(build_context(&sources, 2), "### Note 1: Long\na b");
    }

    #[test]
    fn prompt_contains_question_and_context() {
        let prompt = build_prompt("How long?", "### Note 1: Ramen\nTwelve hours.");
        assert!(prompt.contains("Question: How long?"));
        assert!(prompt.contains("Twelve hours."));
    }
}
