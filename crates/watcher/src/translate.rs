//! Mapping between logical kinds and native tokens

use crate::kind::{KindSet, LogicalKind};
use crate::native::NativeToken;

/// Translates native tokens for one watch request
///
/// The reverse table only holds the requested kinds, so a token for a kind
/// the session did not ask for fails to translate and is routed to the
/// overflow callback like any other unknown token.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    reverse: Vec<(NativeToken, LogicalKind)>,
}

impl EventTranslator {
    /// Build the reverse table for the requested kinds
    pub fn new(kinds: KindSet) -> Self {
        Self {
            reverse: kinds.iter().map(|kind| (Self::to_native(kind), kind)).collect(),
        }
    }

    /// Native token for a logical kind
    pub const fn to_native(kind: LogicalKind) -> NativeToken {
        match kind {
            LogicalKind::Create => NativeToken::EntryCreate,
            LogicalKind::Modify => NativeToken::EntryModify,
            LogicalKind::Delete => NativeToken::EntryDelete,
        }
    }

    /// Logical kind for a native token, if it was requested
    ///
    /// `None` for overflow, unknown and unrequested tokens.
    pub fn to_logical(&self, token: NativeToken) -> Option<LogicalKind> {
        self.reverse
            .iter()
            .find(|(native, _)| *native == token)
            .map(|(_, kind)| *kind)
    }

    /// Native tokens to register with the OS
    pub fn interest(&self) -> Vec<NativeToken> {
        self.reverse.iter().map(|(native, _)| *native).collect()
    }
}
