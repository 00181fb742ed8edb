//! Per-note summarization with channel-specific prompts.
//!
//! The generation provider is tried first; when it is absent, fails, or returns nothing, a
//! deterministic extractive summary built from the note's leading sentences is stored instead.

use crate::{
    config::Config,
    generation::GenerationClient,
    models::{ChannelSettings, Note},
    processing::chunking::{count_words, truncate_words},
    store::{DocumentStore, StoreError},
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Errors raised while summarizing a note or editing channel settings.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The note does not exist.
    #[error("Note not found: {0}")]
    NoteNotFound(Uuid),
    /// Channel keys must contain a non-whitespace character.
    #[error("Channel key must not be empty")]
    EmptyChannel,
    /// Document store failure.
    #[error("Document store request failed: {0}")]
    Store(#[from] StoreError),
}

/// How the stored summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// Written by the generation provider.
    Abstractive,
    /// Assembled from the note's own sentences.
    Extractive,
}

/// Result of [`NoteSummarizer::summarize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryOutcome {
    /// Strategy that produced `summary`.
    pub strategy: SummaryStrategy,
    /// Stored summary text.
    pub summary: String,
}

/// Word budgets applied when summarizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarySettings {
    /// Maximum words in a summary.
    pub max_words: usize,
    /// Maximum words of note content placed in the prompt.
    pub input_max_words: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            max_words: 80,
            input_max_words: 4000,
        }
    }
}

impl From<&Config> for SummarySettings {
    fn from(config: &Config) -> Self {
        Self {
            max_words: config.summary_max_words,
            input_max_words: config.note_max_words,
        }
    }
}

/// Generates and stores note summaries.
pub struct NoteSummarizer {
    store: Arc<dyn DocumentStore>,
    generator: Option<Arc<dyn GenerationClient>>,
    settings: SummarySettings,
}

impl NoteSummarizer {
    /// Build a summarizer; `generator == None` always uses the extractive strategy.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Option<Arc<dyn GenerationClient>>,
        settings: SummarySettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
        }
    }

    /// Create or replace the custom prompt for a channel key.
    pub async fn upsert_channel_settings(
        &self,
        channel: &str,
        custom_prompt: Option<String>,
    ) -> Result<ChannelSettings, SummarizeError> {
        let channel = channel.trim();
        if channel.is_empty() {
            return Err(SummarizeError::EmptyChannel);
        }
        let settings = ChannelSettings {
            channel: channel.to_string(),
            custom_prompt: custom_prompt
                .map(|prompt| prompt.trim().to_string())
                .filter(|prompt| !prompt.is_empty()),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.store.upsert_channel_settings(settings.clone()).await?;
        tracing::info!(
            channel,
            has_custom_prompt = settings.custom_prompt.is_some(),
            "Channel settings upserted"
        );
        Ok(settings)
    }

    /// Summarize a note and store the result with the current timestamp.
    pub async fn summarize(&self, note_id: Uuid) -> Result<SummaryOutcome, SummarizeError> {
        let mut note = self
            .store
            .get_note(note_id)
            .await?
            .ok_or(SummarizeError::NoteNotFound(note_id))?;

        let custom_prompt = self.custom_prompt_for(&note).await;
        let outcome = match self.abstractive(&note, custom_prompt.as_deref()).await {
            Some(summary) => SummaryOutcome {
                strategy: SummaryStrategy::Abstractive,
                summary,
            },
            None => SummaryOutcome {
                strategy: SummaryStrategy::Extractive,
                summary: build_extractive_summary(&note, self.settings.max_words),
            },
        };

        note.summary = Some(outcome.summary.clone());
        note.last_summarized_at = Some(OffsetDateTime::now_utc());
        self.store.update_note(note).await?;

        tracing::info!(
            %note_id,
            strategy = ?outcome.strategy,
            words = count_words(&outcome.summary),
            "Note summarized"
        );
        Ok(outcome)
    }

    async fn custom_prompt_for(&self, note: &Note) -> Option<String> {
        let channel = note.metadata.author()?;
        match self.store.get_channel_settings(channel).await {
            Ok(settings) => settings.and_then(|settings| settings.custom_prompt),
            Err(error) => {
                tracing::warn!(channel, error = %error, "Channel settings lookup failed; using default prompt");
                None
            }
        }
    }

    async fn abstractive(&self, note: &Note, custom_prompt: Option<&str>) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let prompt = build_prompt(note, custom_prompt, self.settings);
        match generator.generate(&prompt).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    tracing::warn!(note_id = %note.id, "Generation returned an empty summary; falling back to extractive");
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(error) => {
                tracing::warn!(
                    note_id = %note.id,
                    error = %error,
                    "Abstractive summarization failed; falling back to extractive"
                );
                None
            }
        }
    }
}

/// Build the summarization prompt, preferring the channel's custom instructions.
pub(crate) fn build_prompt(
    note: &Note,
    custom_prompt: Option<&str>,
    settings: SummarySettings,
) -> String {
    let (content, _) = truncate_words(note.content.trim(), settings.input_max_words);
    let instructions = match custom_prompt {
        Some(custom) => custom.to_string(),
        None => format!(
            "Summarize the following note into a concise, factual paragraph. Prefer neutral tone. Avoid speculation. Return at most {} words.",
            settings.max_words
        ),
    };
    format!(
        "{instructions}\n\nTitle: {}\n\n{content}\n",
        note.title.trim()
    )
}

/// Build a deterministic summary from leading sentences, bounded by `max_words`.
pub(crate) fn build_extractive_summary(note: &Note, max_words: usize) -> String {
    let source = if note.content.trim().is_empty() {
        note.title.trim()
    } else {
        note.content.trim()
    };
    if source.is_empty() || max_words == 0 {
        return "No content available.".into();
    }

    let mut picked: Vec<&str> = Vec::new();
    let mut used_words = 0usize;
    for sentence in sentences(source) {
        let words = count_words(sentence);
        if !picked.is_empty() && used_words + words > max_words {
            break;
        }
        used_words += words;
        picked.push(sentence);
        if used_words >= max_words {
            break;
        }
    }

    let joined = picked.join(" ");
    let (bounded, truncated) = truncate_words(&joined, max_words);
    if truncated {
        format!("{bounded}…")
    } else {
        bounded.to_string()
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}
