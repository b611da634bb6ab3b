//! The set of locks known to this process.

use crate::entry::LockEntry;
use crate::error::{LeaseError, LeaseResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Registered locks, keyed by store key.
///
/// Entries are only ever added. Lookups and iteration go through the
/// concurrent map and never wait on a registration in progress for another
/// key.
#[derive(Default)]
pub(crate) struct LockRegistry {
    entries: DashMap<String, Arc<LockEntry>>,
}

impl LockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a new entry; an existing entry for the same key is left untouched.
    pub(crate) fn insert(&self, entry: LockEntry) -> LeaseResult<Arc<LockEntry>> {
        match self.entries.entry(entry.key().to_string()) {
            Entry::Occupied(occupied) => Err(LeaseError::DuplicateLock(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(entry);
                vacant.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    pub(crate) fn get(&self, key: &str) -> LeaseResult<Arc<LockEntry>> {
        self.entries
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LeaseError::NotRegistered(key.to_string()))
    }

    /// Clone out every entry so callers can await without holding map guards.
    pub(crate) fn snapshot(&self) -> Vec<Arc<LockEntry>> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let registry = LockRegistry::new();
        registry.insert(LockEntry::new("lockA", "node1", None)).unwrap();

        let entry = registry.get("lockA").unwrap();
        assert_eq!(entry.value(), "node1");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let registry = LockRegistry::new();
        let first = registry.insert(LockEntry::new("lockA", "node1", None)).unwrap();
        first.set_local_expiry(5_000);

        let err = registry
            .insert(LockEntry::new("lockA", "node2", None))
            .unwrap_err();
        assert!(matches!(err, LeaseError::DuplicateLock(ref key) if key == "lockA"));

        let kept = registry.get("lockA").unwrap();
        assert_eq!(kept.value(), "node1");
        assert_eq!(kept.local_expiry(), 5_000);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_key() {
        let registry = LockRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(LeaseError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_snapshot_and_keys() {
        let registry = LockRegistry::new();
        registry.insert(LockEntry::new("lockB", "node1", None)).unwrap();
        registry.insert(LockEntry::new("lockA", "node1", None)).unwrap();

        assert_eq!(registry.snapshot().len(), 2);
        assert_eq!(registry.keys(), vec!["lockA".to_string(), "lockB".to_string()]);
    }
}
