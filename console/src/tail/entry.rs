//! Log entries and log endpoint responses

use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

/// Identity used for deduplication across polls.
///
/// Server ids keep their JSON type, so `"1"` and `1` are different entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryId {
    Text(String),
    Number(String),
    Derived(String),
}

/// A single log entry from the log service
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: Option<EntryId>,
    pub timestamp: Option<String>,
    pub message: String,
}

impl LogEntry {
    /// Read an entry from an arbitrary JSON element. Missing fields are
    /// tolerated; a non-string message is kept as compact JSON.
    pub fn from_value(item: &Value) -> Self {
        let id = match item.get("id") {
            Some(Value::String(s)) => Some(EntryId::Text(s.clone())),
            Some(Value::Number(n)) => Some(EntryId::Number(n.to_string())),
            Some(Value::Null) | None => None,
            Some(other) => Some(EntryId::Text(other.to_string())),
        };

        let timestamp = match item.get("timestamp") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let message = match item.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Self {
            id,
            timestamp,
            message,
        }
    }

    /// The server id, or `timestamp-message` when the server sent none
    pub fn identity(&self) -> EntryId {
        match &self.id {
            Some(id) => id.clone(),
            None => EntryId::Derived(format!(
                "{}-{}",
                self.timestamp.as_deref().unwrap_or_default(),
                self.message
            )),
        }
    }

    /// Display line: `[localized-timestamp] message`, or the bare message
    pub fn display_line(&self) -> String {
        match &self.timestamp {
            Some(ts) => format!("[{}] {}", localize_timestamp(ts), self.message),
            None => self.message.clone(),
        }
    }
}

/// Render a timestamp in local time. Accepts RFC 3339 strings and epoch
/// milliseconds; anything else is shown as received.
pub fn localize_timestamp(raw: &str) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(FORMAT).to_string();
    }
    if let Ok(millis) = raw.parse::<i64>() {
        if let Some(parsed) = Local.timestamp_millis_opt(millis).single() {
            return parsed.format(FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Shape of a log endpoint response
#[derive(Debug, Clone, PartialEq)]
pub enum LogResponse {
    /// JSON array of entries
    Entries(Vec<LogEntry>),
    /// JSON that is not an array; displayed as a diagnostic dump
    Diagnostic(Value),
    /// Anything that was not served as JSON
    RawText(String),
}

impl LogResponse {
    /// Classify a response by content type and, for JSON, by shape
    pub fn classify(content_type: &str, body: String) -> Result<Self, serde_json::Error> {
        if !content_type.contains("application/json") {
            return Ok(LogResponse::RawText(body));
        }
        Ok(Self::from_json(serde_json::from_str(&body)?))
    }

    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                LogResponse::Entries(items.iter().map(LogEntry::from_value).collect())
            }
            other => LogResponse::Diagnostic(other),
        }
    }
}
