use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use std::collections::HashSet;
use std::process::Command;

use crate::error::MonitorError;
use crate::session::{get_config, get_sessions, Session};

/// A running assistant process whose log has been silent past the kill threshold
#[derive(Debug, Clone, PartialEq)]
pub struct GhostProcess {
    pub pid: u32,
    pub project: String,
    pub age: Duration,
}

/// Sends a termination request to a process
pub trait Signaller {
    fn terminate(&self, pid: u32) -> Result<(), String>;
}

/// Sends SIGTERM through the `kill` utility
#[derive(Debug, Default, Clone, Copy)]
pub struct KillCommand;

impl Signaller for KillCommand {
    fn terminate(&self, pid: u32) -> Result<(), String> {
        let output = Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .output()
            .map_err(|e| format!("Failed to execute kill command: {}", e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("Failed to signal process {}: {}", pid, stderr.trim()))
        }
    }
}

/// Sessions with a running process whose last activity is older than `threshold`.
/// Sessions without a process (`ghost_pid == 0`) are never ghosts, however old.
pub fn find_ghosts(sessions: &[Session], now: DateTime<Utc>, threshold: Duration) -> Vec<GhostProcess> {
    sessions
        .iter()
        .filter(|s| s.ghost_pid > 0)
        .filter_map(|s| {
            let age = now - s.last_activity;
            (age > threshold).then(|| GhostProcess {
                pid: s.ghost_pid,
                project: s.project.clone(),
                age,
            })
        })
        .collect()
}

/// Gracefully terminate each ghost once. Processes that can't be signalled
/// (usually already gone) are logged and left out of the result.
pub fn kill_ghosts(ghosts: &[GhostProcess], signaller: &dyn Signaller) -> Vec<GhostProcess> {
    let mut signalled: HashSet<u32> = HashSet::new();
    let mut killed = Vec::new();

    for ghost in ghosts {
        if !signalled.insert(ghost.pid) {
            continue;
        }
        match signaller.terminate(ghost.pid) {
            Ok(()) => {
                info!(
                    "Terminated ghost process pid={} project={} idle={}",
                    ghost.pid,
                    ghost.project,
                    format_age(ghost.age)
                );
                killed.push(ghost.clone());
            }
            Err(e) => warn!("Skipping ghost pid={}: {}", ghost.pid, e),
        }
    }

    killed
}

/// Run discovery and return the current ghosts
pub fn find_ghost_processes() -> Result<Vec<GhostProcess>, MonitorError> {
    let sessions = get_sessions()?;
    let threshold = get_config().ghost_threshold();
    Ok(find_ghosts(&sessions, Utc::now(), threshold))
}

/// Run discovery and SIGTERM every ghost; returns the ones that were signalled
pub fn kill_ghost_processes() -> Result<Vec<GhostProcess>, MonitorError> {
    let ghosts = find_ghost_processes()?;
    Ok(kill_ghosts(&ghosts, &KillCommand))
}

/// Just the pids, for simple listing
pub fn ghost_pids(ghosts: &[GhostProcess]) -> Vec<u32> {
    ghosts.iter().map(|g| g.pid).collect()
}

/// Human-readable age: "45s", "12m", "3h", "2d"
pub fn format_age(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 60 * 60 {
        format!("{}m", secs / 60)
    } else if secs < 24 * 60 * 60 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86_400)
    }
}
