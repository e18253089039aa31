//! Best-effort removal of scratch directories when the process finishes.
//!
//! Nothing here is required for correctness: the staging directory is
//! emptied at the start of every run, so a removal that never happens only
//! leaves residue behind until the next build.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

/// A set of paths to delete later.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    scheduled: Mutex<BTreeSet<PathBuf>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, path: impl AsRef<Path>) {
        if let Ok(mut scheduled) = self.scheduled.lock() {
            scheduled.insert(path.as_ref().to_path_buf());
        }
    }

    pub fn scheduled(&self) -> Vec<PathBuf> {
        self.scheduled
            .lock()
            .map(|scheduled| scheduled.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove everything scheduled so far. Failures are logged and ignored.
    pub fn run(&self) {
        let paths = match self.scheduled.lock() {
            Ok(mut scheduled) => std::mem::take(&mut *scheduled),
            Err(_) => return,
        };
        for path in paths {
            if !path.exists() {
                continue;
            }
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match removed {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}

/// The process-wide registry drained by [`CleanupOnExit`]
pub fn global() -> &'static CleanupRegistry {
    static GLOBAL: OnceLock<CleanupRegistry> = OnceLock::new();
    GLOBAL.get_or_init(CleanupRegistry::new)
}

/// Schedule `path` for removal at process exit.
pub fn schedule_removal(path: impl AsRef<Path>) {
    global().schedule(path);
}

/// Guard that drains the process-wide registry when dropped.
///
/// Hold one for the lifetime of `main`; it also fires while unwinding.
/// A killed process skips it.
#[must_use]
pub struct CleanupOnExit(());

impl CleanupOnExit {
    pub fn install() -> Self {
        CleanupOnExit(())
    }
}

impl Drop for CleanupOnExit {
    fn drop(&mut self) {
        global().run();
    }
}
