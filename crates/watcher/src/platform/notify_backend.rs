//! Backend over the platform watcher provided by `notify`

use super::{KeyState, Registration, Take, WatchBackend, WatchCloser, WatchKey};
use crate::error::{Result, WatchError};
use crate::native::{NativeEvent, NativeToken};
use crossbeam_channel::{Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Platform watcher backend
///
/// `notify` cannot subscribe to individual change kinds, so every
/// registration receives all of them.
#[derive(Debug, Clone, Default)]
pub struct NotifyBackend {
    config: Config,
}

impl NotifyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom `notify` configuration (e.g. poll interval)
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }
}

impl WatchBackend for NotifyBackend {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn register(&self, dir: &Path, interest: &[NativeToken]) -> Result<Registration> {
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<notify::Result<Event>>();
        let (close_tx, close_rx) = crossbeam_channel::bounded::<()>(0);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // Receiver gone means the session already stopped
                let _ = raw_tx.send(res);
            },
            self.config.clone(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        debug!(
            "Registered {} with notify (interest: {:?})",
            dir.display(),
            interest
        );

        Ok(Registration {
            key: Box::new(NotifyKey {
                dir: dir.to_path_buf(),
                raw_rx,
                close_rx,
                held_error: None,
                identity: dir_identity(dir),
                dir_gone: false,
            }),
            closer: Box::new(NotifyCloser {
                inner: Mutex::new(Some((watcher, close_tx))),
            }),
        })
    }
}

struct NotifyKey {
    dir: PathBuf,
    raw_rx: Receiver<notify::Result<Event>>,
    /// Disconnects when the closer runs
    close_rx: Receiver<()>,
    /// Error read after events of the same batch; reported on the next take
    held_error: Option<WatchError>,
    /// Identity of the directory that was registered
    identity: Option<(u64, u64)>,
    /// Set once the watched directory itself was removed or renamed away
    dir_gone: bool,
}

impl WatchKey for NotifyKey {
    fn take(&mut self) -> Take {
        if let Some(err) = self.held_error.take() {
            return Take::Failed(err);
        }

        let first = crossbeam_channel::select! {
            recv(self.close_rx) -> _ => return Take::Closed,
            recv(self.raw_rx) -> msg => match msg {
                Ok(res) => res,
                Err(_) => return Take::Closed,
            },
        };

        let mut batch = Vec::new();
        for res in std::iter::once(first).chain(self.raw_rx.try_iter()) {
            match res {
                Ok(event) => {
                    if classify(&self.dir, event, &mut batch) {
                        debug!("Watched directory {} was removed or moved", self.dir.display());
                        self.dir_gone = true;
                    }
                }
                Err(err) => {
                    if batch.is_empty() {
                        return Take::Failed(err.into());
                    }
                    self.held_error = Some(err.into());
                    break;
                }
            }
        }

        Take::Batch(batch)
    }

    fn reset(&mut self) -> Result<KeyState> {
        // A directory recreated at the same path is not the one the OS
        // watch is attached to
        if self.dir_gone || !self.dir.is_dir() || dir_identity(&self.dir) != self.identity {
            return Ok(KeyState::Invalid);
        }
        Ok(KeyState::Valid)
    }
}

struct NotifyCloser {
    inner: Mutex<Option<(RecommendedWatcher, Sender<()>)>>,
}

impl WatchCloser for NotifyCloser {
    fn close(&self) {
        if let Some((watcher, close_tx)) = self.inner.lock().take() {
            // Wake the key first, then release the OS watch
            drop(close_tx);
            drop(watcher);
            trace!("Closed notify registration");
        }
    }
}

#[cfg(unix)]
fn dir_identity(dir: &Path) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(dir).ok().map(|m| (m.dev(), m.ino()))
}

#[cfg(not(unix))]
fn dir_identity(_dir: &Path) -> Option<(u64, u64)> {
    None
}

/// Translate one `notify` event into native events for `dir`
///
/// Returns true when the event says `dir` itself was removed or renamed.
fn classify(dir: &Path, event: Event, out: &mut Vec<NativeEvent>) -> bool {
    if event.need_rescan() {
        out.push(NativeEvent::overflow(dir));
        return false;
    }

    let leaves_dir = matches!(event.kind, EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)));
    if leaves_dir && event.paths.iter().any(|path| path == dir) {
        return true;
    }

    let token = match event.kind {
        // Reads and closes change nothing in the directory
        EventKind::Access(_) => return false,
        EventKind::Create(_) => NativeToken::EntryCreate,
        EventKind::Remove(_) => NativeToken::EntryDelete,
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => NativeToken::EntryDelete,
            RenameMode::To => NativeToken::EntryCreate,
            // Emitted alongside the From/To pair it summarizes
            RenameMode::Both => return false,
            RenameMode::Any | RenameMode::Other => {
                for path in &event.paths {
                    let token = if path.exists() {
                        NativeToken::EntryCreate
                    } else {
                        NativeToken::EntryDelete
                    };
                    push_entry(dir, path, token, out);
                }
                return false;
            }
        },
        EventKind::Modify(_) => NativeToken::EntryModify,
        EventKind::Any | EventKind::Other => NativeToken::Unknown,
    };

    if event.paths.is_empty() {
        out.push(NativeEvent::new(token, dir));
        return false;
    }
    for path in &event.paths {
        push_entry(dir, path, token, out);
    }
    false
}

fn push_entry(dir: &Path, path: &Path, token: NativeToken, out: &mut Vec<NativeEvent>) {
    // Events on the watched directory itself are not entry changes
    if path == dir {
        trace!("Skipping {} event on watched directory", token);
        return;
    }
    let context = match path.file_name() {
        Some(name) => dir.join(name),
        None => dir.to_path_buf(),
    };
    out.push(NativeEvent::new(token, context));
}
