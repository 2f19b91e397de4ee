//! In-process backend fed by the caller
//!
//! Does not touch the OS. Each registration gets a `ManualFeed` through
//! which batches, failures and directory removal are injected, so session
//! behaviour can be driven deterministically.

use super::{KeyState, Registration, Take, WatchBackend, WatchCloser, WatchKey};
use crate::error::{Result, WatchError};
use crate::native::{NativeEvent, NativeToken};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Backend whose events come from `ManualFeed`s
#[derive(Clone, Default)]
pub struct ManualBackend {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    registrations: Vec<ManualRegistration>,
    /// Failure to report from the next `register`
    fail_next: Option<String>,
}

struct ManualRegistration {
    interest: Vec<NativeToken>,
    feed: ManualFeed,
}

enum ManualMessage {
    Batch(Vec<NativeEvent>),
    Fail(String),
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `register` call fail with a backend error
    pub fn fail_next_registration(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Number of successful registrations so far
    pub fn registration_count(&self) -> usize {
        self.state.lock().registrations.len()
    }

    /// Registered directories, in call order
    pub fn registered_dirs(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .registrations
            .iter()
            .map(|r| r.feed.dir.clone())
            .collect()
    }

    /// Tokens requested by registration `index`
    pub fn interest(&self, index: usize) -> Option<Vec<NativeToken>> {
        self.state
            .lock()
            .registrations
            .get(index)
            .map(|r| r.interest.clone())
    }

    /// Feed for registration `index`
    pub fn feed(&self, index: usize) -> Option<ManualFeed> {
        self.state
            .lock()
            .registrations
            .get(index)
            .map(|r| r.feed.clone())
    }

    /// Feed for the most recent registration
    pub fn last_feed(&self) -> Option<ManualFeed> {
        self.state.lock().registrations.last().map(|r| r.feed.clone())
    }
}

impl WatchBackend for ManualBackend {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn register(&self, dir: &Path, interest: &[NativeToken]) -> Result<Registration> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(WatchError::Backend(message));
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let (close_tx, close_rx) = crossbeam_channel::bounded::<()>(0);
        let valid = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));

        let feed = ManualFeed {
            tx,
            dir: dir.to_path_buf(),
            valid: Arc::clone(&valid),
            closed: Arc::clone(&closed),
        };
        state.registrations.push(ManualRegistration {
            interest: interest.to_vec(),
            feed,
        });

        Ok(Registration {
            key: Box::new(ManualKey { rx, close_rx, valid }),
            closer: Box::new(ManualCloser {
                close_tx: Mutex::new(Some(close_tx)),
                closed,
            }),
        })
    }
}

/// Injects events into one manual registration
#[derive(Clone)]
pub struct ManualFeed {
    tx: Sender<ManualMessage>,
    dir: PathBuf,
    valid: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl ManualFeed {
    /// Directory the registration was made for
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deliver a batch; false once the key has been dropped
    pub fn push(&self, batch: Vec<NativeEvent>) -> bool {
        self.tx.send(ManualMessage::Batch(batch)).is_ok()
    }

    /// Deliver a single event for the entry `name`
    pub fn push_entry(&self, token: NativeToken, name: &str) -> bool {
        self.push(vec![NativeEvent::new(token, self.dir.join(name))])
    }

    /// Deliver an overflow marker
    pub fn overflow(&self) -> bool {
        self.push(vec![NativeEvent::overflow(&self.dir)])
    }

    /// Make the next take fail
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.tx.send(ManualMessage::Fail(message.into())).is_ok()
    }

    /// Report the directory as gone on the next reset
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Whether the registration has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ManualKey {
    rx: Receiver<ManualMessage>,
    close_rx: Receiver<()>,
    valid: Arc<AtomicBool>,
}

impl WatchKey for ManualKey {
    fn take(&mut self) -> Take {
        crossbeam_channel::select! {
            recv(self.close_rx) -> _ => Take::Closed,
            recv(self.rx) -> msg => match msg {
                Ok(ManualMessage::Batch(batch)) => Take::Batch(batch),
                Ok(ManualMessage::Fail(message)) => Take::Failed(WatchError::Backend(message)),
                Err(_) => Take::Closed,
            },
        }
    }

    fn reset(&mut self) -> Result<KeyState> {
        if self.valid.load(Ordering::SeqCst) {
            Ok(KeyState::Valid)
        } else {
            Ok(KeyState::Invalid)
        }
    }
}

struct ManualCloser {
    close_tx: Mutex<Option<Sender<()>>>,
    closed: Arc<AtomicBool>,
}

impl WatchCloser for ManualCloser {
    fn close(&self) {
        drop(self.close_tx.lock().take());
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrations_are_recorded() {
        let backend = ManualBackend::new();
        let interest = [NativeToken::EntryCreate, NativeToken::EntryDelete];

        let _first = backend.register(Path::new("/a"), &interest).unwrap();
        let _second = backend.register(Path::new("/b"), &interest[..1]).unwrap();

        assert_eq!(backend.registration_count(), 2);
        assert_eq!(backend.registered_dirs(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(backend.interest(1).unwrap(), vec![NativeToken::EntryCreate]);
        assert_eq!(backend.last_feed().unwrap().dir(), Path::new("/b"));
    }

    #[test]
    fn test_feed_delivers_batches_in_order() {
        let backend = ManualBackend::new();
        let Registration { mut key, closer: _closer } =
            backend.register(Path::new("/d"), &[NativeToken::EntryCreate]).unwrap();
        let feed = backend.feed(0).unwrap();

        assert!(feed.push_entry(NativeToken::EntryCreate, "one"));
        assert!(feed.overflow());

        match key.take() {
            Take::Batch(batch) => assert_eq!(batch, vec![NativeEvent::new(NativeToken::EntryCreate, "/d/one")]),
            other => panic!("expected batch, got {:?}", other),
        }
        match key.take() {
            Take::Batch(batch) => assert_eq!(batch, vec![NativeEvent::overflow(Path::new("/d"))]),
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_close_is_idempotent_and_observable() {
        let backend = ManualBackend::new();
        let Registration { mut key, closer } =
            backend.register(Path::new("/d"), &[NativeToken::EntryDelete]).unwrap();
        let feed = backend.last_feed().unwrap();

        assert!(!feed.is_closed());
        closer.close();
        closer.close();
        assert!(feed.is_closed());
        assert!(matches!(key.take(), Take::Closed));
    }

    #[test]
    fn test_failed_registration() {
        let backend = ManualBackend::new();
        backend.fail_next_registration("no inotify watches left");

        let err = backend.register(Path::new("/d"), &[]).err().unwrap();
        assert!(matches!(err, WatchError::Backend(msg) if msg.contains("inotify")));
        assert_eq!(backend.registration_count(), 0);

        // Only the next call fails
        assert!(backend.register(Path::new("/d"), &[]).is_ok());
    }

    #[test]
    fn test_invalidate_and_fail() {
        let backend = ManualBackend::new();
        let Registration { mut key, closer: _closer } = backend.register(Path::new("/d"), &[]).unwrap();
        let feed = backend.last_feed().unwrap();

        assert_eq!(key.reset().unwrap(), KeyState::Valid);
        feed.invalidate();
        assert_eq!(key.reset().unwrap(), KeyState::Invalid);

        feed.fail("device unplugged");
        assert!(matches!(key.take(), Take::Failed(WatchError::Backend(_))));
    }
}
