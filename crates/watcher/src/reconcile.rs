//! Overflow resynchronisation scanner
//!
//! An overflow means some events were lost. `Reconciler` keeps a snapshot
//! of the watched directory's direct entries and, on demand, rescans and
//! synthesizes the events the lost notifications would have carried.

use crate::error::Result;
use crate::kind::LogicalKind;
use crate::WatchEvent;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// What a rescan compares to detect modification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    len: u64,
    modified: Option<SystemTime>,
}

/// Snapshot of one directory, kept in step with dispatched events
#[derive(Debug)]
pub struct Reconciler {
    dir: PathBuf,
    entries: BTreeMap<PathBuf, Stamp>,
}

impl Reconciler {
    /// Take the initial snapshot of `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let entries = scan(&dir)?;
        debug!("Reconciler snapshot of {}: {} entries", dir.display(), entries.len());
        Ok(Self { dir, entries })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of entries in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a dispatched event so the next rescan does not repeat it
    pub fn observe(&mut self, path: &Path, kind: LogicalKind) {
        match kind {
            LogicalKind::Create | LogicalKind::Modify => match stamp(path) {
                Some(stamp) => {
                    self.entries.insert(path.to_path_buf(), stamp);
                }
                // Gone again before we looked
                None => {
                    self.entries.remove(path);
                }
            },
            LogicalKind::Delete => {
                self.entries.remove(path);
            }
        }
    }

    /// Rescan and return the changes since the snapshot, sorted by path
    ///
    /// The new scan becomes the snapshot.
    pub fn reconcile(&mut self) -> Result<Vec<WatchEvent>> {
        let current = scan(&self.dir)?;
        let mut events = Vec::new();

        for (path, stamp) in &current {
            match self.entries.get(path) {
                None => events.push(WatchEvent::new(path.clone(), LogicalKind::Create)),
                Some(old) if old != stamp => events.push(WatchEvent::new(path.clone(), LogicalKind::Modify)),
                Some(_) => {}
            }
        }
        for path in self.entries.keys() {
            if !current.contains_key(path) {
                events.push(WatchEvent::new(path.clone(), LogicalKind::Delete));
            }
        }

        events.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Reconciled {}: {} missed changes", self.dir.display(), events.len());

        self.entries = current;
        Ok(events)
    }
}

/// Direct entries of `dir`, symlinks not followed
fn scan(dir: &Path) -> Result<BTreeMap<PathBuf, Stamp>> {
    let mut entries = BTreeMap::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            // Removed between listing and stat
            Err(e) if e.io_error().map(|io| io.kind()) == Some(io::ErrorKind::NotFound) && e.depth() > 0 => {
                continue;
            }
            Err(e) => return Err(io::Error::from(e).into()),
        };

        match entry.metadata() {
            Ok(metadata) => {
                entries.insert(
                    entry.into_path(),
                    Stamp {
                        len: metadata.len(),
                        modified: metadata.modified().ok(),
                    },
                );
            }
            Err(e) => trace!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    Ok(entries)
}

fn stamp(path: &Path) -> Option<Stamp> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    Some(Stamp {
        len: metadata.len(),
        modified: metadata.modified().ok(),
    })
}
