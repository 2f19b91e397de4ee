//! Native event tokens produced by the OS watch backends

use std::fmt;
use std::path::{Path, PathBuf};

/// Platform-level event kind, after a backend has read the OS event
///
/// `Overflow` marks lost or coalesced events and has no logical
/// counterpart. `Unknown` covers anything else the OS reports that does
/// not map to a change kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeToken {
    EntryCreate,
    EntryModify,
    EntryDelete,
    Overflow,
    Unknown,
}

impl NativeToken {
    pub const fn as_str(self) -> &'static str {
        match self {
            NativeToken::EntryCreate => "entry_create",
            NativeToken::EntryModify => "entry_modify",
            NativeToken::EntryDelete => "entry_delete",
            NativeToken::Overflow => "overflow",
            NativeToken::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NativeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event retrieved from a watch key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    /// Kind reported by the OS
    pub token: NativeToken,
    /// Affected entry, or the watched directory itself for overflow
    pub context: PathBuf,
}

impl NativeEvent {
    pub fn new(token: NativeToken, context: impl Into<PathBuf>) -> Self {
        Self {
            token,
            context: context.into(),
        }
    }

    /// Overflow marker for the watched directory
    pub fn overflow(dir: &Path) -> Self {
        Self::new(NativeToken::Overflow, dir)
    }
}
