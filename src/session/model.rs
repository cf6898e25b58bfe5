use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Inferred activity state of a monitored session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Working,
    NeedsInput,
    Waiting,
    Inactive,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Working => "Working",
            SessionStatus::NeedsInput => "Needs Input",
            SessionStatus::Waiting => "Waiting",
            SessionStatus::Inactive => "Inactive",
        };
        f.write_str(label)
    }
}

/// One monitored project's current state, rebuilt on every discovery pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub project: String,
    pub status: SessionStatus,
    pub last_activity: DateTime<Utc>,
    pub task: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_branch: String,
    /// Reserved: desktop detection is disabled and this is always false.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_desktop: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_ghost: bool,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub ghost_pid: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_unsandboxed: bool,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub context_percent: f64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub context_tokens: u64,
    #[serde(skip)]
    pub log_file: PathBuf,
    /// Encoded project directory name, the key shared with the running-process map
    #[serde(skip)]
    pub encoded_dir: String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_u32(n: &u32) -> bool {
    *n == 0
}

fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

fn is_zero_f64(n: &f64) -> bool {
    *n == 0.0
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// Kind of a log line, from its `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    System,
    Summary,
    /// progress, file-history-snapshot and anything else we don't classify on
    Other,
}

impl EntryKind {
    fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("user") => EntryKind::User,
            Some("assistant") => EntryKind::Assistant,
            Some("system") => EntryKind::System,
            Some("summary") => EntryKind::Summary,
            _ => EntryKind::Other,
        }
    }
}

/// One parsed line of a session log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub subtype: Option<String>,
    /// `None` when absent or unparsable; orders before every real timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub message: Option<Message>,
    pub summary: Option<String>,
    pub git_branch: Option<String>,
}

impl LogEntry {
    /// Parse a single JSONL line. Returns `None` for anything that isn't a JSON object.
    pub fn parse_line(line: &str) -> Option<LogEntry> {
        serde_json::from_str::<RawEntry>(line).ok().map(LogEntry::from)
    }

    pub fn has_subtype(&self, subtype: &str) -> bool {
        self.subtype.as_deref() == Some(subtype)
    }

    /// Content items of the attached message, empty when there is none
    pub fn content(&self) -> &[ContentItem] {
        self.message
            .as_ref()
            .map(|m| m.content.as_slice())
            .unwrap_or(&[])
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.message.as_ref().and_then(|m| m.usage.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub role: Option<String>,
    pub model: Option<String>,
    pub content: Vec<ContentItem>,
    pub usage: Option<Usage>,
}

/// A single block of message content
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
    },
    /// thinking, image, and other block types
    #[serde(other)]
    Other,
}

/// Token usage reported with an assistant response. Counters are absolute, not deltas.
/// A missing, null or non-numeric counter reads as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cache_creation_input_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cache_read_input_tokens: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub output_tokens: u64,
}

impl Usage {
    /// Tokens occupying the context window for the next turn (output excluded)
    pub fn context_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.cache_creation_input_tokens)
            .saturating_add(self.cache_read_input_tokens)
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()).unwrap_or(0))
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Internal struct for parsing JSONL lines
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntry {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub subtype: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<RawMessage>,
    pub summary: Option<String>,
    #[serde(rename = "gitBranch")]
    pub git_branch: Option<String>,
}

/// Internal struct for message content
#[derive(Debug, Deserialize)]
pub(crate) struct RawMessage {
    pub role: Option<String>,
    pub model: Option<String>,
    pub content: Option<serde_json::Value>,
    pub usage: Option<serde_json::Value>,
}

impl From<RawEntry> for LogEntry {
    fn from(raw: RawEntry) -> Self {
        LogEntry {
            kind: EntryKind::from_type(raw.msg_type.as_deref()),
            subtype: raw.subtype,
            timestamp: raw.timestamp.as_deref().and_then(parse_timestamp),
            message: raw.message.map(Message::from),
            summary: raw.summary,
            git_branch: raw.git_branch,
        }
    }
}

impl From<RawMessage> for Message {
    fn from(raw: RawMessage) -> Self {
        Message {
            role: raw.role,
            model: raw.model,
            content: raw.content.map(content_items).unwrap_or_default(),
            // A malformed usage object loses the token counts, not the entry
            usage: raw.usage.and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}

/// Content is either a plain string or an array of typed blocks
fn content_items(value: serde_json::Value) -> Vec<ContentItem> {
    match value {
        serde_json::Value::String(text) => vec![ContentItem::Text { text }],
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or(ContentItem::Other))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
