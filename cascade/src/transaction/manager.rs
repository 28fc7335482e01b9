//! Transaction id issuing and staleness checks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one navigation attempt.
///
/// Ids are strictly increasing within one [`TransactionManager`]; the zero id
/// is never issued and marks contexts that were never validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    /// The id carried by contexts that no navigation has validated yet.
    pub const NONE: Self = Self(0);

    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Issues transaction ids and answers staleness queries.
///
/// Context liveness is owned by the tree, so the context half of the
/// staleness check is passed in as a flag by the caller.
#[derive(Debug, Default)]
pub struct TransactionManager {
    current: TransactionId,
}

impl TransactionManager {
    /// Creates a manager whose first issued id is `tx-1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new transaction and makes it current.
    pub fn begin(&mut self) -> TransactionId {
        self.current = TransactionId(self.current.0 + 1);
        self.current
    }

    /// Returns the current transaction id.
    #[must_use]
    pub fn current(&self) -> TransactionId {
        self.current
    }

    /// Returns true when `id` is the current transaction.
    #[must_use]
    pub fn is_current(&self, id: TransactionId) -> bool {
        id != TransactionId::NONE && id == self.current
    }

    /// Returns true when `id` is current and the related context, if any,
    /// is still live.
    #[must_use]
    pub fn is_current_for(&self, id: TransactionId, context_unloaded: Option<bool>) -> bool {
        self.is_current(id) && !context_unloaded.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_strictly_increasing() {
        let mut manager = TransactionManager::new();
        let first = manager.begin();
        let second = manager.begin();

        assert!(second > first);
        assert_eq!(manager.current(), second);
        assert_eq!(first.get(), 1);
    }

    #[test]
    fn test_superseded_transaction_is_stale() {
        let mut manager = TransactionManager::new();
        let first = manager.begin();
        assert!(manager.is_current(first));

        let second = manager.begin();
        assert!(!manager.is_current(first));
        assert!(manager.is_current(second));
    }

    #[test]
    fn test_none_is_never_current() {
        let manager = TransactionManager::new();
        assert!(!manager.is_current(TransactionId::NONE));
    }

    #[test]
    fn test_unloaded_context_is_stale() {
        let mut manager = TransactionManager::new();
        let tx = manager.begin();

        assert!(manager.is_current_for(tx, None));
        assert!(manager.is_current_for(tx, Some(false)));
        assert!(!manager.is_current_for(tx, Some(true)));
    }

    #[test]
    fn test_display() {
        assert_eq!(TransactionId::new(7).to_string(), "tx-7");
    }
}
