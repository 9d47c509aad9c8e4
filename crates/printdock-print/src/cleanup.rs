// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deferred file deletion for job-owned files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Ownership of a file that must be deleted once.
///
/// The handle is move-only and [`run`](Self::run) consumes it, so the same
/// handle cannot delete twice.  Dropping a handle without running it leaves
/// the file in place.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a cleanup handle deletes nothing unless run"]
pub struct CleanupHandle {
    path: PathBuf,
}

impl CleanupHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file.
    ///
    /// Returns `Ok(true)` if a file was removed and `Ok(false)` if it was
    /// already gone.
    pub fn run(self) -> std::io::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed job file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "job file already gone");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Run every handle, logging (not propagating) failures.  Returns how many
/// files were actually removed.
pub fn run_all(handles: impl IntoIterator<Item = CleanupHandle>) -> usize {
    let mut removed = 0;
    for handle in handles {
        let path = handle.path().to_path_buf();
        match handle.run() {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove job file"),
        }
    }
    removed
}
