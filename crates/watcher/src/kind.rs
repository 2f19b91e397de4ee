//! Logical event kinds exposed to callbacks

use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of file system event
///
/// The only vocabulary callbacks ever see; stable across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalKind {
    /// Entry created (or moved into the directory)
    Create,
    /// Entry contents or metadata changed
    Modify,
    /// Entry deleted (or moved out of the directory)
    Delete,
}

impl LogicalKind {
    /// Every kind, in canonical order
    pub const ALL: [LogicalKind; 3] = [LogicalKind::Create, LogicalKind::Modify, LogicalKind::Delete];

    /// Lowercase name
    pub const fn as_str(self) -> &'static str {
        match self {
            LogicalKind::Create => "create",
            LogicalKind::Modify => "modify",
            LogicalKind::Delete => "delete",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            LogicalKind::Create => 0b001,
            LogicalKind::Modify => 0b010,
            LogicalKind::Delete => 0b100,
        }
    }
}

impl fmt::Display for LogicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalKind {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(LogicalKind::Create),
            "modify" => Ok(LogicalKind::Modify),
            "delete" => Ok(LogicalKind::Delete),
            _ => Err(WatchError::UnknownKind(s.trim().to_string())),
        }
    }
}

/// Set of logical kinds requested by a watch
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    /// No kinds
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create, Modify and Delete
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// Add a kind
    pub fn insert(&mut self, kind: LogicalKind) {
        self.0 |= kind.bit();
    }

    /// Copy of this set with `kind` added
    pub const fn with(self, kind: LogicalKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Whether `kind` is in the set
    pub const fn contains(self, kind: LogicalKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Kinds in canonical order
    pub fn iter(self) -> Iter {
        Iter { set: self, next: 0 }
    }
}

/// Iterator over the kinds of a `KindSet`
#[derive(Debug, Clone)]
pub struct Iter {
    set: KindSet,
    next: usize,
}

impl Iterator for Iter {
    type Item = LogicalKind;

    fn next(&mut self) -> Option<LogicalKind> {
        while self.next < LogicalKind::ALL.len() {
            let kind = LogicalKind::ALL[self.next];
            self.next += 1;
            if self.set.contains(kind) {
                return Some(kind);
            }
        }
        None
    }
}

impl IntoIterator for KindSet {
    type Item = LogicalKind;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl FromIterator<LogicalKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = LogicalKind>>(iter: I) -> Self {
        let mut set = KindSet::empty();
        set.extend(iter);
        set
    }
}

impl Extend<LogicalKind> for KindSet {
    fn extend<I: IntoIterator<Item = LogicalKind>>(&mut self, iter: I) {
        for kind in iter {
            self.insert(kind);
        }
    }
}

impl From<LogicalKind> for KindSet {
    fn from(kind: LogicalKind) -> Self {
        KindSet::empty().with(kind)
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Comma-separated names, e.g. `create,delete`
impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(kind.as_str())?;
        }
        Ok(())
    }
}

/// Parse a comma-separated list; `all` selects every kind
impl FromStr for KindSet {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = KindSet::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                return Ok(KindSet::all());
            }
            set.insert(part.parse()?);
        }
        if set.is_empty() {
            return Err(WatchError::NoEventKinds);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in LogicalKind::ALL {
            assert_eq!(kind.as_str().parse::<LogicalKind>().unwrap(), kind);
        }
        assert_eq!(" Delete ".parse::<LogicalKind>().unwrap(), LogicalKind::Delete);
        assert!(matches!(
            "rename".parse::<LogicalKind>(),
            Err(WatchError::UnknownKind(name)) if name == "rename"
        ));
    }

    #[test]
    fn test_set_iterates_in_canonical_order() {
        let set: KindSet = [LogicalKind::Delete, LogicalKind::Create, LogicalKind::Delete]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![LogicalKind::Create, LogicalKind::Delete]);
        assert!(set.contains(LogicalKind::Create));
        assert!(!set.contains(LogicalKind::Modify));
        assert_eq!(set.to_string(), "create,delete");
    }

    #[test]
    fn test_set_parsing() {
        assert_eq!("create, delete".parse::<KindSet>().unwrap(), KindSet::empty()
            .with(LogicalKind::Create)
            .with(LogicalKind::Delete));
        assert_eq!("all".parse::<KindSet>().unwrap(), KindSet::all());
        assert!(matches!("".parse::<KindSet>(), Err(WatchError::NoEventKinds)));
        assert!(matches!(" , ".parse::<KindSet>(), Err(WatchError::NoEventKinds)));
        assert!(matches!("create,move".parse::<KindSet>(), Err(WatchError::UnknownKind(_))));
    }

    #[test]
    fn test_serde_names_are_lowercase() {
        let kinds: Vec<LogicalKind> = serde_json::from_str(r#"["create","modify"]"#).unwrap();
        assert_eq!(kinds, vec![LogicalKind::Create, LogicalKind::Modify]);
        assert_eq!(serde_json::to_string(&LogicalKind::Delete).unwrap(), r#""delete""#);
    }
}
