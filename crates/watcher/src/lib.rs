//! Directory watching for dirwatch
//!
//! This crate watches a single directory and dispatches its changes to
//! callbacks:
//! - A stable logical vocabulary (`Create`, `Modify`, `Delete`)
//! - One dispatch thread per session, events in arrival order
//! - Overflow and unrequested kinds routed to a separate callback
//! - Idempotent, thread-safe cancellation
//! - Rescan support for recovering from overflow
//!
//! ```no_run
//! use dirwatch::{KindSet, LogicalKind, WatchRequest, Watcher};
//!
//! let kinds = KindSet::empty().with(LogicalKind::Create).with(LogicalKind::Delete);
//! let handle = Watcher::system().start(WatchRequest::new("/var/spool/in", kinds, |path, kind| {
//!     println!("{} {}", kind, path.display());
//! }))?;
//! handle.cancel();
//! # Ok::<(), dirwatch::WatchError>(())
//! ```

pub mod error;
pub mod kind;
pub mod native;
pub mod platform;
pub mod reconcile;
pub mod request;
pub mod session;
pub mod translate;

use platform::{NotifyBackend, WatchBackend};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

// Re-exports
pub use dirwatch_core::{FsContext, PathSource};
pub use error::{Result, WatchError};
pub use kind::{KindSet, LogicalKind};
pub use native::{NativeEvent, NativeToken};
pub use reconcile::Reconciler;
pub use request::WatchRequest;
pub use session::{SessionState, StopReason, WatchHandle};
pub use translate::EventTranslator;

/// Starts watch sessions against one backend
#[derive(Clone)]
pub struct Watcher {
    ctx: FsContext,
    backend: Arc<dyn WatchBackend>,
}

impl Watcher {
    /// Create a watcher with an explicit filesystem context and backend
    pub fn new<B>(ctx: FsContext, backend: B) -> Self
    where
        B: WatchBackend + 'static,
    {
        Self {
            ctx,
            backend: Arc::new(backend),
        }
    }

    /// System temp dir and the platform backend
    pub fn system() -> Self {
        Self::new(FsContext::system(), NotifyBackend::new())
    }

    pub fn context(&self) -> &FsContext {
        &self.ctx
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Register the request's directory and start dispatching
    ///
    /// Fails synchronously, without spawning anything, if no kinds were
    /// requested, the directory cannot be resolved, or registration fails.
    pub fn start(&self, request: WatchRequest) -> Result<WatchHandle> {
        if request.kinds.is_empty() {
            return Err(WatchError::NoEventKinds);
        }

        let dir = self.ctx.resolve_dir(&request.dir)?;
        let translator = EventTranslator::new(request.kinds);
        let registration = self.backend.register(&dir, &translator.interest())?;

        debug!(
            "Registered {} for {} via {}",
            dir.display(),
            request.kinds,
            self.backend.name()
        );

        session::spawn(dir, translator, registration, request)
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("ctx", &self.ctx)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Start a watch with the system context and platform backend
pub fn watch(request: WatchRequest) -> Result<WatchHandle> {
    Watcher::system().start(request)
}

/// A change to one entry of the watched directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: LogicalKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: LogicalKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
