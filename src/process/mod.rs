mod claude;
mod ghost;

pub use claude::{is_agent_command, SysinfoLister};
pub use ghost::{
    find_ghost_processes, find_ghosts, format_age, ghost_pids, kill_ghost_processes, kill_ghosts,
    GhostProcess, KillCommand, Signaller,
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::session::encode_project_path;

/// A running assistant process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProcess {
    pub pid: u32,
    pub cwd: Option<PathBuf>,
    /// Process start time in seconds since UNIX epoch
    pub start_time: u64,
}

/// Source of running assistant processes. The sysinfo-backed [`SysinfoLister`] is used in
/// production; tests substitute a fixed list.
pub trait ProcessLister {
    fn list_processes(&self) -> Vec<AgentProcess>;
}

/// Map of encoded project directory name -> pid for every running assistant process.
/// Processes without a readable cwd are left out. When several share a cwd, the most
/// recently started one wins.
pub fn running_dirs(lister: &dyn ProcessLister) -> HashMap<String, u32> {
    let processes = lister.list_processes();
    let mut newest: HashMap<String, &AgentProcess> = HashMap::new();

    for process in &processes {
        if process.pid == 0 {
            continue;
        }
        let cwd = match &process.cwd {
            Some(cwd) => cwd,
            None => {
                trace!("Process pid={} has no cwd, skipping", process.pid);
                continue;
            }
        };

        let encoded = encode_project_path(&cwd.to_string_lossy());
        debug!("Mapping process pid={} to {}", process.pid, encoded);
        newest
            .entry(encoded)
            .and_modify(|existing| {
                if process.start_time > existing.start_time {
                    *existing = process;
                }
            })
            .or_insert(process);
    }

    newest
        .into_iter()
        .map(|(dir, process)| (dir, process.pid))
        .collect()
}
