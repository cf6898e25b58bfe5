use log::{debug, trace};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

use super::{AgentProcess, ProcessLister};

// Reuse System instance to avoid expensive re-initialization
static SYSTEM: Mutex<Option<System>> = Mutex::new(None);

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
        .with_cmd(sysinfo::UpdateKind::Always)
        .with_cwd(sysinfo::UpdateKind::Always)
}

/// Lists assistant processes from the OS process table
#[derive(Debug, Clone)]
pub struct SysinfoLister {
    process_name: String,
}

impl SysinfoLister {
    pub fn new(process_name: impl Into<String>) -> Self {
        SysinfoLister {
            process_name: process_name.into(),
        }
    }
}

impl Default for SysinfoLister {
    fn default() -> Self {
        SysinfoLister::new("claude")
    }
}

/// True when a command line (or bare process name) invokes `name`,
/// either directly ("claude") or by path ("/usr/local/bin/claude").
pub fn is_agent_command(first_arg: &OsStr, name: &str) -> bool {
    let arg = first_arg.to_string_lossy().to_lowercase();
    let name = name.to_lowercase();
    if arg == name {
        return true;
    }
    Path::new(arg.as_str())
        .file_name()
        .map(|f| f.to_string_lossy() == name.as_str())
        .unwrap_or(false)
}

impl ProcessLister for SysinfoLister {
    /// Find all running assistant processes, excluding sub-agents (whose parent is
    /// also an assistant process).
    fn list_processes(&self) -> Vec<AgentProcess> {
        debug!("=== Starting process discovery ===");

        let mut system_guard = match SYSTEM.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Initialize system if not already done
        let system = system_guard.get_or_insert_with(|| {
            debug!("Initializing new System instance");
            System::new_with_specifics(RefreshKind::new().with_processes(refresh_kind()))
        });

        system.refresh_processes_specifics(sysinfo::ProcessesToUpdate::All, refresh_kind());
        trace!("Total system processes: {}", system.processes().len());

        let is_agent = |process: &sysinfo::Process| {
            process
                .cmd()
                .first()
                .map(|arg| is_agent_command(arg, &self.process_name))
                .unwrap_or(false)
                || is_agent_command(process.name(), &self.process_name)
        };

        // First pass: collect all assistant PIDs
        let agent_pids: HashSet<Pid> = system
            .processes()
            .iter()
            .filter(|(_, process)| is_agent(*process))
            .map(|(pid, _)| *pid)
            .collect();

        let mut processes = Vec::new();

        // Second pass: keep top-level assistant processes
        for pid in &agent_pids {
            let process = match system.process(*pid) {
                Some(p) => p,
                None => continue,
            };

            if let Some(parent_pid) = process.parent() {
                if agent_pids.contains(&parent_pid) {
                    debug!(
                        "Skipping sub-agent process: pid={}, parent_pid={}",
                        pid.as_u32(),
                        parent_pid.as_u32()
                    );
                    continue;
                }
            }

            let cwd = process.cwd().map(|p| p.to_path_buf());
            debug!("Found assistant process: pid={}, cwd={:?}", pid.as_u32(), cwd);

            processes.push(AgentProcess {
                pid: pid.as_u32(),
                cwd,
                start_time: process.start_time(),
            });
        }

        debug!(
            "Process discovery complete: found {} processes named {:?}",
            processes.len(),
            self.process_name
        );
        processes
    }
}
