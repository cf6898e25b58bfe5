use chrono::Utc;
use std::process::ExitCode;

use session_monitor::process::{format_age, kill_ghost_processes};
use session_monitor::session::{discover_history, get_config, get_sessions};
use session_monitor::{init_logging, MonitorError};

const DEFAULT_HISTORY_DAYS: u32 = 7;

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("--kill-ghosts") => kill_ghosts(),
        Some("--history") => {
            let days = args
                .get(1)
                .and_then(|d| d.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_DAYS);
            print_history(days)
        }
        _ => print_sessions(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_sessions() -> Result<(), MonitorError> {
    let sessions = get_sessions()?;
    print_json(&sessions);
    Ok(())
}

fn print_history(days: u32) -> Result<(), MonitorError> {
    let projects_dir = get_config()
        .resolve_projects_dir()
        .ok_or(MonitorError::HomeDirUnavailable)?;
    let history = discover_history(&projects_dir, days, Utc::now())?;
    print_json(&history);
    Ok(())
}

fn kill_ghosts() -> Result<(), MonitorError> {
    let killed = kill_ghost_processes()?;
    if killed.is_empty() {
        println!("No ghost processes found");
    }
    for ghost in killed {
        println!(
            "Killed pid {} ({}, idle {})",
            ghost.pid,
            ghost.project,
            format_age(ghost.age)
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
