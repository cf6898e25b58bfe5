pub mod error;
pub mod process;
pub mod session;

#[cfg(test)]
mod tests;

pub use error::MonitorError;
pub use process::{find_ghost_processes, kill_ghost_processes, GhostProcess, ProcessLister};
pub use session::{discover, get_sessions, Session, SessionStatus};

/// Initialize env_logger once. Reads `RUST_LOG`, defaulting to `warn`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
