mod config;
mod context;
mod history;
mod model;
mod parser;
mod path;
mod reader;
mod status;

pub use config::{
    config_path, default_projects_dir, get_config, invalidate_config_cache, read_config,
    MonitorConfig, PROJECTS_DIR_ENV,
};
pub use context::{extract_context_usage, CONTEXT_WINDOW};
pub use history::{date_group, discover_history, extract_project_name, HistorySession};
pub use model::{
    parse_timestamp, ContentItem, EntryKind, LogEntry, Message, Session, SessionStatus, Usage,
};
pub use parser::{
    detect_unsandboxed_commands, discover, extract_git_branch, extract_last_assistant_message,
    find_most_recent_log, get_sessions, parse_session, sort_sessions,
};
pub use path::{decode_project_name, encode_project_path, FILLER};
pub use reader::{extract_summary, read_last_entries, MAX_LINE_BYTES, MAX_SUMMARY_LINE_BYTES};
pub use status::{
    determine_status, determine_status_with, extract_task, has_tool_result, has_tool_use,
    status_sort_priority, truncate_chars, StatusDecision, GHOST_AFTER_SECS, STALE_AFTER_SECS,
    WORKING_WINDOW_SECS,
};
