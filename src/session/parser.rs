use chrono::{DateTime, Utc};
use log::{debug, info, trace};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::config::{get_config, MonitorConfig};
use super::context::extract_context_usage;
use super::model::{ContentItem, EntryKind, LogEntry, Session, SessionStatus};
use super::path::decode_project_name;
use super::reader::{extract_summary, read_last_entries};
use super::status::{determine_status_with, status_sort_priority};
use crate::error::MonitorError;
use crate::process::{running_dirs, ProcessLister, SysinfoLister};

const HEADING_PREFIXES: [&str; 3] = ["### ", "## ", "# "];

/// Get all sessions under the configured projects directory, using the live process table
pub fn get_sessions() -> Result<Vec<Session>, MonitorError> {
    let config = get_config();
    let projects_dir = config
        .resolve_projects_dir()
        .ok_or(MonitorError::HomeDirUnavailable)?;
    let lister = SysinfoLister::new(config.process_name.as_str());
    discover(&projects_dir, &lister, Utc::now(), &config)
}

/// Build one session per project directory under `projects_dir`, sorted by status
/// priority and then by most recent activity.
///
/// Only an unreadable `projects_dir` fails the call. Projects whose directory or log
/// can't be read are dropped.
pub fn discover(
    projects_dir: &Path,
    lister: &dyn ProcessLister,
    now: DateTime<Utc>,
    config: &MonitorConfig,
) -> Result<Vec<Session>, MonitorError> {
    info!("=== Discovering sessions in {:?} ===", projects_dir);

    let entries = fs::read_dir(projects_dir).map_err(|source| MonitorError::ProjectsDir {
        path: projects_dir.to_path_buf(),
        source,
    })?;

    // Directories where the assistant is currently running
    let running = running_dirs(lister);
    debug!("Found {} running project directories", running.len());

    let mut sessions = Vec::new();

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }

        let dir_name = entry.file_name().to_string_lossy().to_string();
        if dir_name.starts_with('.') {
            continue;
        }

        let log_file = match find_most_recent_log(&entry.path()) {
            Ok(Some(path)) => path,
            Ok(None) => {
                trace!("Project {} has no session logs, skipping", dir_name);
                continue;
            }
            Err(e) => {
                debug!("Cannot list project {}: {}", dir_name, e);
                continue;
            }
        };

        match parse_session(&dir_name, &log_file, &running, now, config) {
            Ok(session) => {
                debug!(
                    "Session: project={}, status={:?}, task={}, pid={}",
                    session.project, session.status, session.task, session.ghost_pid
                );
                sessions.push(session);
            }
            Err(e) => debug!("Failed to read session log {:?}: {}", log_file, e),
        }
    }

    sort_sessions(&mut sessions);

    info!("=== Session scan complete: {} total ===", sessions.len());
    Ok(sessions)
}

/// Order by status priority, then newest activity first
pub fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        status_sort_priority(&a.status)
            .cmp(&status_sort_priority(&b.status))
            .then_with(|| b.last_activity.cmp(&a.last_activity))
    });
}

/// Check if a JSONL file is a subagent file (named agent-*.jsonl)
fn is_subagent_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with("agent-"))
        .unwrap_or(false)
}

/// Pick the log to classify in a project directory: the most recently modified
/// non-empty `.jsonl` file, unless an even newer empty one exists. A newer empty file
/// is a session that just started and hasn't written anything yet.
/// Subagent logs are ignored.
pub fn find_most_recent_log(project_dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut newest_non_empty: Option<(PathBuf, SystemTime)> = None;
    let mut newest_overall: Option<(PathBuf, SystemTime)> = None;

    for entry in fs::read_dir(project_dir)?.flatten() {
        let path = entry.path();
        let is_jsonl = path.extension().map(|ext| ext == "jsonl").unwrap_or(false);
        if !is_jsonl || is_subagent_file(&path) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(_) => continue,
        };

        if newest_overall.as_ref().map_or(true, |(_, t)| modified > *t) {
            newest_overall = Some((path.clone(), modified));
        }
        if metadata.len() > 0 && newest_non_empty.as_ref().map_or(true, |(_, t)| modified > *t) {
            newest_non_empty = Some((path, modified));
        }
    }

    let chosen = match (newest_non_empty, newest_overall) {
        (Some((path, t)), Some((fresh, fresh_t))) => {
            if fresh_t > t {
                fresh
            } else {
                path
            }
        }
        (None, overall) => return Ok(overall.map(|(p, _)| p)),
        (non_empty, None) => return Ok(non_empty.map(|(p, _)| p)),
    };

    Ok(Some(chosen))
}

/// Parse one project's session log into a `Session`.
///
/// Fails only when the log can't be stat'd. If the tail can't be read the session
/// keeps its defaults (Inactive, no task).
pub fn parse_session(
    encoded_dir: &str,
    log_file: &Path,
    running: &HashMap<String, u32>,
    now: DateTime<Utc>,
    config: &MonitorConfig,
) -> io::Result<Session> {
    let modified: DateTime<Utc> = fs::metadata(log_file)?.modified()?.into();

    let mut session = Session {
        project: decode_project_name(encoded_dir),
        status: SessionStatus::Inactive,
        last_activity: modified.min(now),
        task: "-".to_string(),
        summary: String::new(),
        last_message: String::new(),
        git_branch: String::new(),
        is_desktop: false,
        is_ghost: false,
        ghost_pid: 0,
        has_unsandboxed: false,
        context_percent: 0.0,
        context_tokens: 0,
        log_file: log_file.to_path_buf(),
        encoded_dir: encoded_dir.to_string(),
    };

    let pid = running.get(encoded_dir).copied().filter(|&pid| pid > 0);
    let is_running = pid.is_some();

    let entries = match read_last_entries(log_file, config.tail_len()) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {:?}, keeping defaults: {}", log_file, e);
            return Ok(session);
        }
    };

    trace!("Read {} entries from {:?}", entries.len(), log_file);

    if !entries.is_empty() {
        session.summary = extract_summary(log_file);
        session.last_message = extract_last_assistant_message(&entries);
        session.git_branch = extract_git_branch(&entries);
        session.has_unsandboxed = detect_unsandboxed_commands(&entries);
        let (percent, tokens) = extract_context_usage(&entries);
        session.context_percent = percent;
        session.context_tokens = tokens;
    }

    let decision = determine_status_with(&entries, is_running, now, config.ghost_threshold());
    session.status = decision.status;
    session.task = decision.task;

    if decision.status != SessionStatus::Inactive {
        session.ghost_pid = pid.unwrap_or(0);
        session.is_ghost = decision.is_ghost && session.ghost_pid > 0;
    }

    let last_entry_time = entries.iter().rev().find_map(|e| e.timestamp);
    if let Some(ts) = last_entry_time {
        session.last_activity = modified.max(ts).min(now);
    }

    Ok(session)
}

/// First line of the most recent assistant text, without a leading markdown heading marker
pub fn extract_last_assistant_message(entries: &[LogEntry]) -> String {
    let text = entries
        .iter()
        .rev()
        .filter(|e| e.kind == EntryKind::Assistant)
        .flat_map(|e| e.content().iter())
        .find_map(|item| match item {
            ContentItem::Text { text } if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        });

    let first_line = match text {
        Some(text) => text.lines().next().unwrap_or(text),
        None => return String::new(),
    };

    HEADING_PREFIXES
        .iter()
        .find_map(|prefix| first_line.strip_prefix(prefix))
        .unwrap_or(first_line)
        .to_string()
}

/// Most recent non-empty git branch
pub fn extract_git_branch(entries: &[LogEntry]) -> String {
    entries
        .iter()
        .rev()
        .filter_map(|e| e.git_branch.as_deref())
        .find(|branch| !branch.is_empty())
        .unwrap_or("")
        .to_string()
}

/// True if any Bash tool call asked to run outside the sandbox
pub fn detect_unsandboxed_commands(entries: &[LogEntry]) -> bool {
    entries
        .iter()
        .filter(|e| e.kind == EntryKind::Assistant)
        .flat_map(|e| e.content().iter())
        .any(|item| match item {
            ContentItem::ToolUse { name, input } if name == "Bash" => input
                .get("dangerouslyDisableSandbox")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            _ => false,
        })
}
