//! Watch sessions: one registration, one dispatch thread, one handle
//!
//! The dispatch thread blocks in `WatchKey::take`, translates each batch
//! and runs the callbacks in arrival order. Every stop goes through
//! `Shared::stop`, which flips `running` exactly once, closes the
//! registration and records why the session ended.

use crate::error::{Result, WatchError};
use crate::native::{NativeEvent, NativeToken};
use crate::platform::{KeyState, Registration, Take, WatchCloser, WatchKey};
use crate::request::{ErrorCallback, EventCallback, OverflowCallback, WatchRequest};
use crate::translate::EventTranslator;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Why a session stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `WatchHandle::cancel` was called
    Cancelled,
    /// The OS mechanism was closed underneath the session
    Closed,
    /// The watched directory no longer exists
    DirectoryRemoved,
    /// The backend failed, or a callback panicked
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::Closed => f.write_str("watch mechanism closed"),
            StopReason::DirectoryRemoved => f.write_str("directory removed"),
            StopReason::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped(StopReason),
}

/// State shared by the handles and the dispatch thread
struct Shared {
    dir: PathBuf,
    running: AtomicBool,
    /// Set once, together with the `running` transition
    reason: Mutex<Option<StopReason>>,
    stopped: Condvar,
    closer: Box<dyn WatchCloser>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the session; false if it had already stopped
    fn stop(&self, reason: StopReason) -> bool {
        let mut slot = self.reason.lock();
        if self
            .running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.closer.close();
        info!("Stopped watching {} ({})", self.dir.display(), reason);
        *slot = Some(reason);
        drop(slot);

        self.stopped.notify_all();
        true
    }

    fn state(&self) -> SessionState {
        match &*self.reason.lock() {
            Some(reason) => SessionState::Stopped(reason.clone()),
            None => SessionState::Running,
        }
    }

    fn wait_until(&self, deadline: Option<Instant>) -> bool {
        let mut slot = self.reason.lock();
        while slot.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.stopped.wait_until(&mut slot, deadline).timed_out() {
                        break;
                    }
                }
                None => self.stopped.wait(&mut slot),
            }
        }
        slot.is_some()
    }
}

/// Cancellation handle for a running watch
///
/// Cheap to clone and usable from any thread, including from inside the
/// session's own callbacks. Dropping a handle never cancels the watch.
#[derive(Clone)]
pub struct WatchHandle {
    shared: Arc<Shared>,
    thread: Arc<ThreadSlot>,
}

impl WatchHandle {
    /// Stop the watch and release the OS registration
    ///
    /// Idempotent. A callback already running completes, and the dispatch
    /// thread stops at its next event boundary.
    pub fn cancel(&self) {
        self.shared.stop(StopReason::Cancelled);
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Resolved directory being watched
    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    /// Block until the session stops
    pub fn wait(&self) -> StopReason {
        self.shared.wait_until(None);
        match self.shared.state() {
            SessionState::Stopped(reason) => reason,
            SessionState::Running => StopReason::Closed,
        }
    }

    /// Block until the session stops or `timeout` elapses
    ///
    /// Returns whether the session has stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.wait_until(Some(Instant::now() + timeout))
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("dir", &self.shared.dir)
            .field("state", &self.state())
            .field("daemon", &self.thread.daemon)
            .finish()
    }
}

/// Owns the dispatch thread's join handle; dropped with the last handle
struct ThreadSlot {
    handle: Option<JoinHandle<()>>,
    daemon: bool,
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        if self.daemon {
            return;
        }
        if let Some(handle) = self.handle.take() {
            // A callback may hold the last handle; never join ourselves
            if handle.thread().id() == thread::current().id() {
                return;
            }
            debug!("Waiting for non-daemon dispatch thread to finish");
            if handle.join().is_err() {
                warn!("Dispatch thread ended with a panic");
            }
        }
    }
}

/// Start the dispatch thread for a registered directory
///
/// On spawn failure the registration is closed before returning.
pub(crate) fn spawn(
    dir: PathBuf,
    translator: EventTranslator,
    registration: Registration,
    request: WatchRequest,
) -> Result<WatchHandle> {
    let Registration { key, closer } = registration;
    let WatchRequest {
        on_event,
        on_overflow,
        on_error,
        daemon,
        ..
    } = request;

    let shared = Arc::new(Shared {
        dir: dir.clone(),
        running: AtomicBool::new(true),
        reason: Mutex::new(None),
        stopped: Condvar::new(),
        closer,
    });

    let dispatcher = Dispatcher {
        shared: Arc::clone(&shared),
        key,
        translator,
        on_event,
        on_overflow,
        on_error,
    };

    let spawned = thread::Builder::new()
        .name(format!("dirwatch:{}", dir.display()))
        .spawn(move || dispatcher.run());

    let handle = match spawned {
        Ok(handle) => handle,
        Err(err) => {
            shared.closer.close();
            return Err(WatchError::Spawn(err));
        }
    };

    info!("Watching {} (daemon: {})", dir.display(), daemon);

    Ok(WatchHandle {
        shared,
        thread: Arc::new(ThreadSlot {
            handle: Some(handle),
            daemon,
        }),
    })
}

/// Everything the dispatch thread owns
struct Dispatcher {
    shared: Arc<Shared>,
    key: Box<dyn WatchKey>,
    translator: EventTranslator,
    on_event: EventCallback,
    on_overflow: OverflowCallback,
    on_error: Option<ErrorCallback>,
}

impl Dispatcher {
    fn run(mut self) {
        let _guard = StopOnPanic(Arc::clone(&self.shared));

        while self.shared.is_running() {
            match self.key.take() {
                Take::Closed => {
                    self.shared.stop(StopReason::Closed);
                    break;
                }
                Take::Failed(err) => {
                    self.fail(err);
                    break;
                }
                Take::Batch(batch) => {
                    self.dispatch(batch);
                    if !self.shared.is_running() {
                        break;
                    }
                    match self.key.reset() {
                        Ok(KeyState::Valid) => {}
                        Ok(KeyState::Invalid) => {
                            warn!("Watched directory {} is gone", self.shared.dir.display());
                            self.shared.stop(StopReason::DirectoryRemoved);
                            break;
                        }
                        Err(err) => {
                            self.fail(err);
                            break;
                        }
                    }
                }
            }
        }

        debug!("Dispatch loop for {} exited", self.shared.dir.display());
    }

    /// Run callbacks for one batch, in arrival order
    fn dispatch(&mut self, batch: Vec<NativeEvent>) {
        trace!("Dispatching batch of {} events", batch.len());

        for event in batch {
            // Cancellation takes effect at the next event boundary; a
            // callback that already passed this check still runs
            if !self.shared.is_running() {
                trace!("Session stopped mid-batch; dropping remaining events");
                return;
            }
            match event.token {
                NativeToken::Overflow => {
                    debug!("Overflow in {}", self.shared.dir.display());
                    (self.on_overflow)(&event.context, None);
                }
                token => match self.translator.to_logical(token) {
                    Some(kind) => (self.on_event)(&event.context, kind),
                    None => {
                        trace!("Routing {} for {} to overflow", token, event.context.display());
                        (self.on_overflow)(&event.context, Some(token));
                    }
                },
            }
        }
    }

    fn fail(&mut self, err: WatchError) {
        error!("Watch on {} failed: {}", self.shared.dir.display(), err);
        if self.shared.stop(StopReason::Failed(err.to_string())) {
            if let Some(on_error) = self.on_error.take() {
                on_error(&err);
            }
        }
    }
}

/// Stops the session if the dispatch thread unwinds
struct StopOnPanic(Arc<Shared>);

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if thread::panicking() && self.0.stop(StopReason::Failed("dispatch thread panicked".into())) {
            error!("Dispatch thread for {} panicked", self.0.dir.display());
        }
    }
}
