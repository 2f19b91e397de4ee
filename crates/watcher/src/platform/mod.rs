//! OS watch mechanisms
//!
//! Provides a unified interface (`WatchBackend`) over the mechanism that
//! actually delivers directory events:
//! - `NotifyBackend`: the platform watcher (inotify, FSEvents, kqueue,
//!   ReadDirectoryChangesW) via `notify`
//! - `ManualBackend`: in-process, fed by the caller (tests, embedding)
//!
//! A registration is split in two. The `WatchKey` half moves to the
//! dispatch thread and is the only place that blocks. The `WatchCloser`
//! half stays with whoever may cancel, and closing it makes a blocked
//! `take` return `Take::Closed`.

pub mod manual;
pub mod notify_backend;

use crate::error::Result;
use crate::native::{NativeEvent, NativeToken};
use crate::WatchError;
use std::path::Path;

pub use manual::{ManualBackend, ManualFeed};
pub use notify_backend::NotifyBackend;

/// Outcome of waiting on a watch key
#[derive(Debug)]
pub enum Take {
    /// Events ready, in arrival order (may be empty)
    Batch(Vec<NativeEvent>),
    /// The mechanism was closed; normal termination
    Closed,
    /// The mechanism failed and cannot deliver further events
    Failed(WatchError),
}

/// Whether a key can keep delivering after being re-armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Valid,
    /// The watched directory is gone
    Invalid,
}

/// Receiving half of one registration
pub trait WatchKey: Send {
    /// Block until a batch is ready or the mechanism is closed
    fn take(&mut self) -> Take;

    /// Acknowledge the last batch and re-arm
    fn reset(&mut self) -> Result<KeyState>;
}

/// Closing half of one registration
///
/// `close` must be idempotent and safe to call while the key is blocked
/// in `take` on another thread.
pub trait WatchCloser: Send + Sync {
    fn close(&self);
}

/// One live registration against an OS watch mechanism
pub struct Registration {
    pub key: Box<dyn WatchKey>,
    pub closer: Box<dyn WatchCloser>,
}

/// Factory for registrations
pub trait WatchBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Register `dir` (already resolved) for the given native tokens
    ///
    /// Backends that cannot filter by kind deliver every change kind; the
    /// session routes unrequested ones to overflow.
    fn register(&self, dir: &Path, interest: &[NativeToken]) -> Result<Registration>;
}
