use chrono::{DateTime, Duration, Utc};

use super::model::{ContentItem, EntryKind, LogEntry, SessionStatus};

/// Silence after which a running session is considered waiting on the user.
pub const STALE_AFTER_SECS: i64 = 5 * 60;

/// An assistant entry younger than this means the assistant is still producing output.
pub const WORKING_WINDOW_SECS: i64 = 30;

/// Silence after which a running session is flagged as a ghost.
pub const GHOST_AFTER_SECS: i64 = 60 * 60;

const TURN_DURATION: &str = "turn_duration";
const MAX_TASK_CHARS: usize = 50;

/// Outcome of classifying a session's log tail
#[derive(Debug, Clone, PartialEq)]
pub struct StatusDecision {
    pub status: SessionStatus,
    pub task: String,
    pub is_ghost: bool,
}

impl StatusDecision {
    fn new(status: SessionStatus, task: impl Into<String>) -> Self {
        StatusDecision {
            status,
            task: task.into(),
            is_ghost: false,
        }
    }

    fn idle(status: SessionStatus) -> Self {
        StatusDecision::new(status, "-")
    }
}

/// Check if message content contains a tool_use block
pub fn has_tool_use(content: &[ContentItem]) -> bool {
    content
        .iter()
        .any(|item| matches!(item, ContentItem::ToolUse { .. }))
}

/// Check if message content contains a tool_result block
pub fn has_tool_result(content: &[ContentItem]) -> bool {
    content
        .iter()
        .any(|item| matches!(item, ContentItem::ToolResult { .. }))
}

/// Name of the first tool_use block, if any
fn first_tool_use(content: &[ContentItem]) -> Option<&str> {
    content.iter().find_map(|item| match item {
        ContentItem::ToolUse { name, .. } => Some(name.as_str()),
        _ => None,
    })
}

/// Returns sort priority for status (lower = higher priority in list)
pub fn status_sort_priority(status: &SessionStatus) -> u8 {
    match status {
        SessionStatus::Working => 0,
        SessionStatus::NeedsInput => 1,
        SessionStatus::Waiting => 2,
        SessionStatus::Inactive => 3,
    }
}

/// The most recent entry of each kind the classifier cares about.
struct RecentEntries<'a> {
    assistant: Option<&'a LogEntry>,
    user: Option<&'a LogEntry>,
    turn_end: Option<&'a LogEntry>,
    latest: Option<DateTime<Utc>>,
}

impl<'a> RecentEntries<'a> {
    /// One backward pass; stops as soon as all three kinds have been seen.
    fn scan(entries: &'a [LogEntry]) -> Self {
        let mut recent = RecentEntries {
            assistant: None,
            user: None,
            turn_end: None,
            latest: None,
        };

        for entry in entries.iter().rev() {
            if entry.timestamp > recent.latest {
                recent.latest = entry.timestamp;
            }

            match entry.kind {
                EntryKind::Assistant if recent.assistant.is_none() => {
                    recent.assistant = Some(entry)
                }
                EntryKind::User if recent.user.is_none() => recent.user = Some(entry),
                EntryKind::System
                    if recent.turn_end.is_none() && entry.has_subtype(TURN_DURATION) =>
                {
                    recent.turn_end = Some(entry)
                }
                _ => {}
            }

            if recent.assistant.is_some() && recent.user.is_some() && recent.turn_end.is_some() {
                break;
            }
        }

        recent
    }
}

/// Determine session status from the tail of its log.
///
/// Pure: the result depends only on `entries`, `is_running` and `now`.
/// - no entries -> Waiting if running (fresh session), else Inactive
/// - not running -> Inactive
/// - last assistant has tool_use without a later tool_result -> NeedsInput
/// - tool_result sent, turn not finished -> Working ("Processing...")
/// - no activity for 5 minutes -> Waiting (flagged ghost after 1 hour)
/// - turn finished (turn_duration) -> Waiting
/// - assistant wrote within 30 seconds -> Working
/// - otherwise -> Waiting
pub fn determine_status(
    entries: &[LogEntry],
    is_running: bool,
    now: DateTime<Utc>,
) -> StatusDecision {
    determine_status_with(entries, is_running, now, Duration::seconds(GHOST_AFTER_SECS))
}

/// [`determine_status`] with a custom ghost threshold: a stale session is flagged as a
/// ghost once its latest activity is older than `ghost_after`.
pub fn determine_status_with(
    entries: &[LogEntry],
    is_running: bool,
    now: DateTime<Utc>,
    ghost_after: Duration,
) -> StatusDecision {
    if entries.is_empty() {
        // A running process with an empty log is a session still starting up
        return if is_running {
            StatusDecision::idle(SessionStatus::Waiting)
        } else {
            StatusDecision::idle(SessionStatus::Inactive)
        };
    }

    if !is_running {
        return StatusDecision::idle(SessionStatus::Inactive);
    }

    let recent = RecentEntries::scan(entries);

    // Pending tool approval is checked before staleness: it is never downgraded
    if let Some(assistant) = recent.assistant {
        if let Some(tool_name) = first_tool_use(assistant.content()) {
            let answered = recent
                .user
                .filter(|user| user.timestamp > assistant.timestamp)
                .filter(|user| has_tool_result(user.content()));

            return match answered {
                Some(user) => {
                    let turn_finished = recent
                        .turn_end
                        .map(|end| end.timestamp > user.timestamp)
                        .unwrap_or(false);
                    if turn_finished {
                        StatusDecision::idle(SessionStatus::Waiting)
                    } else {
                        StatusDecision::new(SessionStatus::Working, "Processing...")
                    }
                }
                None => {
                    StatusDecision::new(SessionStatus::NeedsInput, format!("Using: {}", tool_name))
                }
            };
        }
    }

    // The user may simply be away; this is not ghost detection on its own
    let stale = match recent.latest {
        Some(ts) => now - ts > Duration::seconds(STALE_AFTER_SECS),
        None => true,
    };
    if stale {
        let mut decision = StatusDecision::idle(SessionStatus::Waiting);
        decision.is_ghost = recent
            .latest
            .map(|ts| now - ts > ghost_after)
            .unwrap_or(false);
        return decision;
    }

    if let Some(turn_end) = recent.turn_end {
        let after_assistant = recent
            .assistant
            .map(|assistant| turn_end.timestamp >= assistant.timestamp)
            .unwrap_or(true);
        if after_assistant {
            return StatusDecision::idle(SessionStatus::Waiting);
        }
    }

    if let Some(assistant) = recent.assistant {
        let is_recent = assistant
            .timestamp
            .map(|ts| now - ts < Duration::seconds(WORKING_WINDOW_SECS))
            .unwrap_or(false);
        if is_recent {
            return StatusDecision::new(SessionStatus::Working, extract_task(assistant));
        }
    }

    StatusDecision::idle(SessionStatus::Waiting)
}

/// Short description of what an assistant entry is doing
pub fn extract_task(entry: &LogEntry) -> String {
    let content = entry.content();

    if let Some(ContentItem::ToolUse { name, .. }) = content.last() {
        if !name.is_empty() {
            return format!("Using: {}", name);
        }
    }

    let text = content.iter().find_map(|item| match item {
        ContentItem::Text { text } if !text.trim().is_empty() => Some(text.trim()),
        _ => None,
    });

    match text {
        Some(text) => truncate_chars(text.lines().next().unwrap_or(text), MAX_TASK_CHARS),
        None => "-".to_string(),
    }
}

/// Truncate to at most `max` characters, marking the cut with "..."
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", s.chars().take(keep).collect::<String>())
}
