use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// A single search result row.
pub type Record = Map<String, Value>;

/// An incoming chat message, independent of the transport it arrived on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Transport name (e.g. "webhook", "cli").
    pub channel: String,
    /// Platform-specific user ID. Keys the pending-confirmation slot.
    pub sender_id: String,
    /// Message text content.
    pub text: String,
}

/// One entry in a classifier conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// "user" or "assistant".
    pub role: String,
    /// The message content. Structured classifier replies are stored as JSON.
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A report file written to disk, retrievable later by `filename`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub row_count: usize,
}

/// Whether a record is an error marker from the search backend.
pub fn is_error_marker(record: &Record) -> bool {
    record.contains_key("error")
}

/// Render a classifier payload as user-facing text. JSON strings are
/// unwrapped; anything else is rendered as compact JSON.
pub fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
