//! Watch request builder

use crate::error::WatchError;
use crate::kind::{KindSet, LogicalKind};
use crate::native::NativeToken;
use dirwatch_core::PathSource;
use std::fmt;
use std::path::Path;

/// Primary callback: `(affected path, kind)`
pub type EventCallback = Box<dyn FnMut(&Path, LogicalKind) + Send>;

/// Overflow callback: `(affected context, triggering token)`
///
/// The token is `None` for a true overflow and `Some` for unknown or
/// unrequested kinds.
pub type OverflowCallback = Box<dyn FnMut(&Path, Option<NativeToken>) + Send>;

/// Called once if the session stops on a backend failure
pub type ErrorCallback = Box<dyn FnOnce(&WatchError) + Send>;

/// Everything needed to start one watch session
///
/// Callbacks only ever run on the session's dispatch thread, one at a
/// time, so they need `Send` but not `Sync`.
pub struct WatchRequest {
    pub(crate) dir: PathSource,
    pub(crate) kinds: KindSet,
    pub(crate) on_event: EventCallback,
    pub(crate) on_overflow: OverflowCallback,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) daemon: bool,
}

impl WatchRequest {
    /// Watch `dir` for `kinds`, calling `on_event` for each change
    pub fn new<F>(dir: impl Into<PathSource>, kinds: impl Into<KindSet>, on_event: F) -> Self
    where
        F: FnMut(&Path, LogicalKind) + Send + 'static,
    {
        Self {
            dir: dir.into(),
            kinds: kinds.into(),
            on_event: Box::new(on_event),
            on_overflow: Box::new(|_, _| {}),
            on_error: None,
            daemon: true,
        }
    }

    /// Receive overflow and unrequested-kind notifications
    pub fn on_overflow<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Path, Option<NativeToken>) + Send + 'static,
    {
        self.on_overflow = Box::new(f);
        self
    }

    /// Be told when the session stops on a backend failure
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&WatchError) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Whether the dispatch thread is detached (default `true`)
    ///
    /// Non-daemon sessions make dropping the last handle wait for the
    /// dispatch thread to finish.
    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    pub fn dir(&self) -> &PathSource {
        &self.dir
    }

    pub fn kinds(&self) -> KindSet {
        self.kinds
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon
    }
}

impl fmt::Debug for WatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRequest")
            .field("dir", &self.dir)
            .field("kinds", &self.kinds)
            .field("on_error", &self.on_error.is_some())
            .field("daemon", &self.daemon)
            .finish_non_exhaustive()
    }
}
