//! Error types for the watch subsystem

use dirwatch_core::FsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting or running a watch
#[derive(Error, Debug)]
pub enum WatchError {
    /// The request named no event kinds
    #[error("No event kinds requested")]
    NoEventKinds,

    /// Unrecognized event kind name
    #[error("Unknown event kind '{0}' (expected create, modify or delete)")]
    UnknownKind(String),

    /// The directory to watch does not exist
    #[error("Directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// The directory exists but may not be read
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// The directory reference could not be turned into a path
    #[error("Invalid path: {0}")]
    InvalidPath(#[source] FsError),

    /// The OS watch mechanism reported a failure
    #[error("Watch backend error: {0}")]
    Backend(String),

    /// The dispatch thread could not be started
    #[error("Failed to spawn dispatch thread: {0}")]
    Spawn(#[source] io::Error),

    /// IO error while scanning the watched directory
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

impl From<FsError> for WatchError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::NotFound(path) => WatchError::DirectoryNotFound(path),
            FsError::PermissionDenied(path) => WatchError::PermissionDenied(path),
            FsError::NotADirectory(path) => WatchError::NotADirectory(path),
            other => WatchError::InvalidPath(other),
        }
    }
}

/// Convert notify errors, keeping the registration-time kinds callers match on
impl From<notify::Error> for WatchError {
    fn from(err: notify::Error) -> Self {
        let path = err.paths.first().cloned().unwrap_or_default();
        match &err.kind {
            notify::ErrorKind::PathNotFound => WatchError::DirectoryNotFound(path),
            notify::ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::PermissionDenied => {
                WatchError::PermissionDenied(path)
            }
            _ => WatchError::Backend(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_errors_map_to_watch_errors() {
        let path = PathBuf::from("/watched");

        assert!(matches!(
            WatchError::from(FsError::NotFound(path.clone())),
            WatchError::DirectoryNotFound(p) if p == path
        ));
        assert!(matches!(
            WatchError::from(FsError::PermissionDenied(path.clone())),
            WatchError::PermissionDenied(_)
        ));
        assert!(matches!(
            WatchError::from(FsError::NotADirectory(path)),
            WatchError::NotADirectory(_)
        ));
        assert!(matches!(
            WatchError::from(FsError::EmptyPath),
            WatchError::InvalidPath(FsError::EmptyPath)
        ));
    }

    #[test]
    fn test_notify_path_not_found() {
        let err = notify::Error::path_not_found().add_path(PathBuf::from("/gone"));
        assert!(matches!(
            WatchError::from(err),
            WatchError::DirectoryNotFound(p) if p == PathBuf::from("/gone")
        ));
    }
}
