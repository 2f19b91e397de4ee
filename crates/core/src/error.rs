//! Error types for filesystem context operations

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by path conversion and filesystem helpers
#[derive(Error, Debug)]
pub enum FsError {
    /// An empty string or path was given where a location was expected
    #[error("Empty path")]
    EmptyPath,

    /// A URI that does not name a local file
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Nothing exists at the path
    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    /// The process may not access the path
    #[error("Permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Any other I/O failure
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_path_buf()),
            _ => FsError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Result type for filesystem context operations
pub type Result<T> = std::result::Result<T, FsError>;
