//! Explicit filesystem context
//!
//! Everything that would otherwise read process-wide state (the default
//! temp directory) goes through an `FsContext` the caller constructs and
//! passes in. Tests build one pointing at a scratch directory.

use crate::error::{FsError, Result};
use crate::path::{self, PathSource};
use crate::temp::TempFileGuard;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Filesystem context injected into collaborators and watch sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsContext {
    /// Directory for temp files when the caller names none
    temp_dir: PathBuf,
}

impl FsContext {
    /// Create a context with an explicit temp directory
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Create a context from the OS defaults
    ///
    /// The temp directory is read once, here.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Directory used for temp files by default
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Convert a path source into a path (no filesystem access)
    pub fn to_path(&self, source: &PathSource) -> Result<PathBuf> {
        path::to_path(source)
    }

    /// Resolve a path source to an existing, readable directory
    ///
    /// The returned path is canonical, so events reported under it compare
    /// equal to paths built from it.
    pub fn resolve_dir(&self, source: &PathSource) -> Result<PathBuf> {
        let path = self.to_path(source)?;

        let resolved = dunce::canonicalize(&path).map_err(|e| FsError::from_io(&path, e))?;
        let metadata = fs::metadata(&resolved).map_err(|e| FsError::from_io(&resolved, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(resolved));
        }

        // Listing is what a watch needs; try it now so permission
        // problems surface before anything is registered
        fs::read_dir(&resolved).map_err(|e| FsError::from_io(&resolved, e))?;

        trace!("Resolved directory {} -> {}", path.display(), resolved.display());
        Ok(resolved)
    }

    /// Create an empty temp file that outlives this call
    ///
    /// The file is created in `dir`, or in the context temp directory.
    pub fn create_temp_file(&self, dir: Option<&Path>, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let dir = dir.unwrap_or(&self.temp_dir);

        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)
            .map_err(|e| FsError::from_io(dir, e))?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| FsError::from_io(dir, e.error))?;

        debug!("Created temp file {}", path.display());
        Ok(path)
    }

    /// Create a temp file that is deleted when the guard drops
    pub fn scoped_temp_file(&self, dir: Option<&Path>, prefix: &str, suffix: &str) -> Result<TempFileGuard> {
        self.create_temp_file(dir, prefix, suffix)
            .map(TempFileGuard::new)
    }

    /// Delete a file or an empty directory
    ///
    /// A missing path is only an error when `fail_on_missing` is set.
    pub fn delete(&self, path: &Path, fail_on_missing: bool) -> Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !fail_on_missing => {
                trace!("Nothing to delete at {}", path.display());
                return Ok(());
            }
            Err(e) => return Err(FsError::from_io(path, e)),
        };

        let removed = if metadata.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            // Lost a race with another deleter
            Err(e) if e.kind() == io::ErrorKind::NotFound && !fail_on_missing => Ok(()),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

impl Default for FsContext {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_dir_canonicalizes() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a");
        fs::create_dir(&nested).unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let dotted = temp_dir.path().join("a").join("..").join("a");
        let resolved = ctx.resolve_dir(&PathSource::from(dotted)).unwrap();

        assert_eq!(resolved, dunce::canonicalize(&nested).unwrap());
    }

    #[test]
    fn test_resolve_dir_missing() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let missing = temp_dir.path().join("missing");
        let err = ctx.resolve_dir(&PathSource::from(missing.clone())).unwrap_err();

        assert!(matches!(err, FsError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_resolve_dir_rejects_files() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let err = ctx.resolve_dir(&PathSource::from(file)).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
    }

    #[test]
    fn test_create_temp_file_uses_context_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let path = ctx.create_temp_file(None, "report-", ".csv").unwrap();

        assert!(path.exists());
        assert_eq!(path.parent().unwrap(), temp_dir.path());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("report-"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_create_temp_file_in_explicit_dir() {
        let temp_dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let path = ctx.create_temp_file(Some(other.path()), "x", "").unwrap();
        assert_eq!(path.parent().unwrap(), other.path());
    }

    #[test]
    fn test_delete_missing_respects_flag() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());
        let missing = temp_dir.path().join("gone.txt");

        ctx.delete(&missing, false).unwrap();
        assert!(matches!(
            ctx.delete(&missing, true),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_file_and_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let file = temp_dir.path().join("f.txt");
        fs::write(&file, b"data").unwrap();
        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();

        ctx.delete(&file, true).unwrap();
        ctx.delete(&dir, true).unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_delete_non_empty_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FsContext::new(temp_dir.path());

        let dir = temp_dir.path().join("d");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inner"), b"x").unwrap();

        assert!(ctx.delete(&dir, false).is_err());
        assert!(dir.exists());
    }
}
