//! Filesystem context for dirwatch
//!
//! This crate provides the synchronous I/O glue the watcher relies on:
//! - Path-like inputs (`PathSource`) and their conversion to paths
//! - An injected filesystem context (`FsContext`) instead of process globals
//! - Temp-file creation and scoped deletion

pub mod context;
pub mod error;
pub mod path;
pub mod temp;

// Re-exports
pub use context::FsContext;
pub use error::{FsError, Result};
pub use path::{to_path, PathSource};
pub use temp::TempFileGuard;
