use super::model::{EntryKind, LogEntry};

/// Context window size for Claude models (200K tokens)
pub const CONTEXT_WINDOW: u64 = 200_000;

const COMPACT_BOUNDARY: &str = "compact_boundary";
const MICROCOMPACT_BOUNDARY: &str = "microcompact_boundary";

fn is_compaction_boundary(entry: &LogEntry) -> bool {
    entry.kind == EntryKind::System
        && (entry.has_subtype(COMPACT_BOUNDARY) || entry.has_subtype(MICROCOMPACT_BOUNDARY))
}

/// Extract context usage from the last assistant entry with usage data.
/// Returns the percentage of the context window in use and the token count behind it.
///
/// Each usage record is an absolute snapshot of the context, so only the most recent one
/// counts. Entries at or before the last compaction boundary are ignored: compaction
/// resets the context and older numbers no longer describe it.
pub fn extract_context_usage(entries: &[LogEntry]) -> (f64, u64) {
    let boundary = entries.iter().rposition(is_compaction_boundary);
    let start = boundary.map(|idx| idx + 1).unwrap_or(0);

    entries[start..]
        .iter()
        .rev()
        .filter(|e| e.kind == EntryKind::Assistant)
        .filter_map(|e| e.usage())
        .map(|usage| usage.context_tokens())
        .find(|&tokens| tokens > 0)
        .map(|tokens| (tokens as f64 / CONTEXT_WINDOW as f64 * 100.0, tokens))
        .unwrap_or((0.0, 0))
}
