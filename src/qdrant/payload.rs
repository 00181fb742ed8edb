//! Helpers for building and reading the payload stored with each chunk vector.
//!
//! The payload tags every point with `note_id` and `chunk_id`; search relies on both.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Payload key holding the owning note id.
pub const NOTE_ID_KEY: &str = "note_id";
/// Payload key holding the owning chunk id.
pub const CHUNK_ID_KEY: &str = "chunk_id";
/// Payload key holding the RFC3339 indexing time.
pub const INDEXED_AT_KEY: &str = "indexed_at";

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(note_id: Uuid, chunk_id: Uuid, timestamp_rfc3339: &str) -> Value {
    let mut payload = Map::new();
    payload.insert(NOTE_ID_KEY.into(), Value::String(note_id.to_string()));
    payload.insert(CHUNK_ID_KEY.into(), Value::String(chunk_id.to_string()));
    payload.insert(
        INDEXED_AT_KEY.into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    Value::Object(payload)
}

/// Read the `(chunk_id, note_id)` tags back out of a payload.
pub(crate) fn parse_owner_ids(payload: &Map<String, Value>) -> Option<(Uuid, Uuid)> {
    let read = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
    };
    Some((read(CHUNK_ID_KEY)?, read(NOTE_ID_KEY)?))
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
