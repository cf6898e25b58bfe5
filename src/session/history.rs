use chrono::{DateTime, Duration, Local, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::model::parse_timestamp;
use crate::error::MonitorError;

const INDEX_FILE: &str = "sessions-index.json";

/// A past session, as recorded in a project's sessions index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySession {
    pub project: String,
    pub git_branch: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds between start and last modification
    pub duration_secs: i64,
    pub message_count: u32,
    pub first_prompt: String,
    #[serde(skip)]
    pub log_file: PathBuf,
}

/// Internal struct for parsing sessions-index.json
#[derive(Debug, Deserialize)]
struct SessionIndex {
    #[serde(default)]
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IndexEntry {
    full_path: String,
    created: String,
    modified: String,
    message_count: u32,
    first_prompt: String,
    git_branch: String,
    project_path: String,
    is_sidechain: bool,
}

/// Find every session started within the past `days` days, newest first.
/// Unreadable or malformed index files are skipped.
pub fn discover_history(
    projects_dir: &Path,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<HistorySession>, MonitorError> {
    // A window reaching past the earliest representable time includes everything
    let cutoff = Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let dirs = fs::read_dir(projects_dir).map_err(|source| MonitorError::ProjectsDir {
        path: projects_dir.to_path_buf(),
        source,
    })?;

    let mut sessions = Vec::new();

    for dir in dirs.flatten() {
        let index_path = dir.path().join(INDEX_FILE);
        if !index_path.is_file() {
            continue;
        }

        let entries = match read_index(&index_path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping {:?}: {}", index_path, e);
                continue;
            }
        };

        for entry in entries {
            if entry.is_sidechain {
                continue;
            }

            let start_time = match parse_timestamp(&entry.created) {
                Some(t) => t,
                None => continue,
            };
            if start_time < cutoff {
                continue;
            }

            let end_time = parse_timestamp(&entry.modified).unwrap_or(start_time);

            sessions.push(HistorySession {
                project: extract_project_name(&entry.project_path),
                git_branch: entry.git_branch,
                start_time,
                end_time,
                duration_secs: (end_time - start_time).num_seconds(),
                message_count: entry.message_count,
                first_prompt: entry.first_prompt,
                log_file: PathBuf::from(entry.full_path),
            });
        }
    }

    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    Ok(sessions)
}

fn read_index(path: &Path) -> io::Result<Vec<IndexEntry>> {
    let content = fs::read_to_string(path)?;
    let index: SessionIndex = serde_json::from_str(&content)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(index.entries)
}

/// Readable project name from a full project path:
/// "/Users/me/Projects/org/app" -> "org/app", otherwise the last two components.
pub fn extract_project_name(full_path: &str) -> String {
    if let Some(idx) = full_path.find("/Projects/") {
        return full_path[idx + "/Projects/".len()..].to_string();
    }

    let parts: Vec<&str> = full_path.split('/').collect();
    if parts.len() >= 2 {
        return format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1]);
    }

    Path::new(full_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// "Today", "Yesterday" or a short date like "Jan 2", in local time
pub fn date_group(t: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let day = t.with_timezone(&Local).date_naive();
    let today = now.with_timezone(&Local).date_naive();

    match (today - day).num_days() {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        _ => day.format("%b %-d").to_string(),
    }
}
