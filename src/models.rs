//! Domain records shared by the store, the pipeline, and the search services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

/// Well-known metadata key for the capture platform (e.g. `youtube`, `x`).
pub const META_PLATFORM: &str = "platform";
/// Well-known metadata key for the author or channel a note was captured from.
pub const META_AUTHOR: &str = "author";
/// Well-known metadata key for the original URL of a captured post or video.
pub const META_SOURCE_URL: &str = "source_url";
/// Well-known metadata key for the RFC3339 capture timestamp.
pub const META_CAPTURED_AT: &str = "captured_at";

/// Enum-like label describing where a note came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NoteCategory {
    /// Typed by the user.
    #[default]
    Manual,
    /// Captured from a social post.
    Social,
    /// Captured from a video transcript.
    Video,
    /// Captured from an article or web page.
    Article,
    /// Any other label supplied by the caller.
    Other(String),
}

impl NoteCategory {
    /// Canonical lowercase label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Social => "social",
            Self::Video => "video",
            Self::Article => "article",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for NoteCategory {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "manual" | "" => Self::Manual,
            "social" => Self::Social,
            "video" => Self::Video,
            "article" => Self::Article,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<NoteCategory> for String {
    fn from(value: NoteCategory) -> Self {
        value.as_str().to_string()
    }
}

/// Open key/value metadata attached to a note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteMetadata(BTreeMap<String, String>);

impl NoteMetadata {
    /// Empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert that ignores blank values.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a trimmed value; blank values remove the key instead.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_string(), trimmed.to_string());
        }
    }

    /// Raw lookup by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Capture platform, if recorded.
    pub fn platform(&self) -> Option<&str> {
        self.get(META_PLATFORM)
    }

    /// Author or channel key, if recorded.
    pub fn author(&self) -> Option<&str> {
        self.get(META_AUTHOR)
    }

    /// Original source URL, if recorded.
    pub fn source_url(&self) -> Option<&str> {
        self.get(META_SOURCE_URL)
    }

    /// Capture timestamp string, if recorded.
    pub fn captured_at(&self) -> Option<&str> {
        self.get(META_CAPTURED_AT)
    }

    /// Iterate over every key/value pair in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// A saved note and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque identifier.
    pub id: Uuid,
    /// Short title.
    pub title: String,
    /// Raw text; always stored in full even when the embedded form is truncated.
    pub content: String,
    /// Source label.
    pub category: NoteCategory,
    /// Generated summary, if any.
    pub summary: Option<String>,
    /// Optional semi-structured payload extracted from the source.
    pub structured_data: Option<serde_json::Value>,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Publication time of the captured source, when known.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    /// Last time a summary was generated.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_summarized_at: Option<OffsetDateTime>,
    /// Platform, author/channel, source URL, and capture time.
    pub metadata: NoteMetadata,
}

impl Note {
    /// Create a fresh note with a new identifier and the current timestamp.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            category: NoteCategory::default(),
            summary: None,
            structured_data: None,
            created_at: OffsetDateTime::now_utc(),
            published_at: None,
            last_summarized_at: None,
            metadata: NoteMetadata::new(),
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: NoteCategory) -> Self {
        self.category = category;
        self
    }

    /// Replace the metadata map.
    pub fn with_metadata(mut self, metadata: NoteMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Bounded-size text segment of a note; the unit of embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier, also used as the vector id.
    pub id: Uuid,
    /// Owning note.
    pub note_id: Uuid,
    /// Segment text.
    pub content: String,
    /// Zero-based position within the note.
    pub index: usize,
}

/// Why a job was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// First ingestion of a new note.
    Create,
    /// Re-ingestion after the title or content changed.
    Update,
}

/// Snapshot of a note captured when its ingestion job was enqueued.
///
/// Workers operate on this value, never on the live note, so edits made after
/// submission cannot race with an in-flight job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJob {
    /// Job identifier used in logs and worker events.
    pub id: Uuid,
    /// Note being ingested.
    pub note_id: Uuid,
    /// Title at enqueue time.
    pub title: String,
    /// Content at enqueue time.
    pub content: String,
    /// Metadata at enqueue time.
    pub metadata: NoteMetadata,
    /// Create or update.
    pub kind: JobKind,
}

impl ProcessingJob {
    /// Capture a job snapshot from the current state of a note.
    pub fn from_note(note: &Note, kind: JobKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            note_id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            metadata: note.metadata.clone(),
            kind,
        }
    }
}

/// Per-channel overrides for summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Author/channel key, matching [`NoteMetadata::author`].
    pub channel: String,
    /// Prompt text or schema replacing the default summarization prompt.
    pub custom_prompt: Option<String>,
    /// Last upsert time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A note paired with its relevance to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNote {
    /// The matching note.
    pub note: Note,
    /// Best chunk similarity for the note.
    pub score: f32,
}
