//! Operator readiness gate.
//!
//! # Responsibilities
//! - Create the served directory when it is absent
//! - Block startup until the operator confirms and the directory has content
//!
//! The gate is a plain channel of "operator pressed Enter" events. Production
//! feeds it from stdin; tests feed it directly.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

/// Error type for the readiness gate.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("cannot inspect {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("operator input closed and {0} is empty")]
    Closed(PathBuf),
}

/// Create `dir` (and parents) if it does not exist. Returns `true` when created.
///
/// New directories get mode 0750 on unix.
pub fn ensure_update_dir(dir: &Path) -> io::Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create(dir)?;

    tracing::info!(path = %dir.display(), "Folder created");
    Ok(true)
}

/// Whether `dir` contains at least one entry.
pub fn dir_has_entries(dir: &Path) -> io::Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_some())
}

/// Wait for operator confirmations until `dir` has at least one entry.
///
/// Every event on `ready` triggers one check, and so does the sender side
/// going away (stdin at EOF when running unattended). Fails with
/// [`ReadinessError::Closed`] only if the folder is still empty by then.
pub async fn wait_until_ready(
    dir: &Path,
    mut ready: mpsc::Receiver<()>,
) -> Result<(), ReadinessError> {
    tracing::info!(path = %dir.display(), "Place the files in the folder");

    loop {
        tracing::info!("Press Enter to continue");
        let closed = ready.recv().await.is_none();

        let ready_now = dir_has_entries(dir).map_err(|source| ReadinessError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if ready_now {
            tracing::info!(path = %dir.display(), "Update folder is ready");
            return Ok(());
        }
        if closed {
            return Err(ReadinessError::Closed(dir.to_path_buf()));
        }

        tracing::warn!(path = %dir.display(), "Folder is empty, put the files in it");
    }
}

/// Feed one event per line read from stdin.
///
/// Reading happens on a dedicated OS thread; a blocking stdin read never
/// holds up runtime shutdown.
pub fn spawn_stdin_feeder() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);

    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || tx.blocking_send(()).is_err() {
                break;
            }
        }
    });

    rx
}
