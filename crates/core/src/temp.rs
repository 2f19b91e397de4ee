//! Scoped temp-file lifetime

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Deletes its file when dropped
///
/// Created by `FsContext::scoped_temp_file`. Call `keep` to hand the file
/// over instead of deleting it.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    /// Guard an existing file
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Path of the guarded file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and return the path
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temp file {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::FsContext;
    use tempfile::TempDir;

    #[test]
    fn test_guard_deletes_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let guard = ctx.scoped_temp_file(None, "scoped", ".tmp").unwrap();
        let path = guard.path().to_path_buf();
        assert!(path.exists());

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_disarms_guard() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let guard = ctx.scoped_temp_file(None, "kept", "").unwrap();
        let path = guard.keep();

        assert!(path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let guard = ctx.scoped_temp_file(None, "early", "").unwrap();
        std::fs::remove_file(guard.path()).unwrap();

        drop(guard);
    }
}
