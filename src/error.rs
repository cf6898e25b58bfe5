use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole discovery pass.
/// Per-project problems never end up here: that project is dropped and the pass continues.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("unable to determine home directory")]
    HomeDirUnavailable,

    #[error("cannot read projects directory {path:?}: {source}")]
    ProjectsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
