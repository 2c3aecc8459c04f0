//! # Handler registry - concurrent key → entry store.
//!
//! ## Architecture
//! ```text
//! Emitter::on/once ──► Registry::register(entry)   (insert-if-absent, atomic)
//! Emitter::send ─────► Registry::lookup(key)       (point read)
//!                  └─► Registry::remove_entry(key, &entry)   (once cleanup, identity-checked)
//! Emitter::remove ───► Registry::remove(key)       (unconditional)
//! ```
//!
//! ## Rules
//! - At most one entry per key at any instant.
//! - Check-and-insert happens under the shard lock of the key (`DashMap::entry`),
//!   so two racing registrations cannot both observe "absent".
//! - Removing a missing key is a no-op.
//! - Once cleanup only removes the exact entry it consumed; a fresh registration
//!   under the same key survives a stale cleanup.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::DispatchError;
use crate::handler::HandlerEntry;

/// Concurrent registry of live handlers.
#[derive(Debug, Default)]
pub struct Registry {
    entries: DashMap<String, Arc<HandlerEntry>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `entry` only if its key is free.
    ///
    /// On collision the new entry is dropped and the existing one is untouched.
    pub fn register(&self, entry: HandlerEntry) -> Result<Arc<HandlerEntry>, DispatchError> {
        match self.entries.entry(entry.key().to_owned()) {
            Entry::Occupied(o) => Err(DispatchError::AlreadyExists {
                key: o.key().clone(),
            }),
            Entry::Vacant(v) => {
                let entry = Arc::new(entry);
                v.insert(Arc::clone(&entry));
                Ok(entry)
            }
        }
    }

    /// Returns the live entry for `key`.
    pub fn lookup(&self, key: &str) -> Result<Arc<HandlerEntry>, DispatchError> {
        self.entries
            .get(key)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| DispatchError::NotFound {
                key: key.to_owned(),
            })
    }

    /// Removes `key` unconditionally; returns whether something was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes `key` only while it still maps to `entry`.
    pub fn remove_entry(&self, key: &str, entry: &Arc<HandlerEntry>) -> bool {
        self.entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Returns true if `key` has a live entry.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns sorted list of registered keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Callable;
    use std::sync::Barrier;
    use std::thread;

    fn entry(key: &str, once: bool) -> HandlerEntry {
        HandlerEntry::new(key.into(), once, Callable::from_fn(|| {}))
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let reg = Registry::new();
        let first = reg.register(entry("add", false)).unwrap();
        let err = reg.register(entry("add", true)).unwrap_err();
        assert_eq!(err, DispatchError::AlreadyExists { key: "add".into() });

        let live = reg.lookup("add").unwrap();
        assert!(Arc::ptr_eq(&first, &live));
        assert!(!live.once());
    }

    #[test]
    fn lookup_missing_is_not_found() {
        let reg = Registry::new();
        assert_eq!(
            reg.lookup("nope").unwrap_err(),
            DispatchError::NotFound { key: "nope".into() }
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let reg = Registry::new();
        reg.register(entry("k", false)).unwrap();
        assert!(reg.remove("k"));
        assert!(!reg.remove("k"));
        assert!(reg.is_empty());
        assert!(reg.register(entry("k", false)).is_ok());
    }

    #[test]
    fn stale_cleanup_spares_new_registration() {
        let reg = Registry::new();
        let old = reg.register(entry("k", true)).unwrap();
        reg.remove("k");
        let fresh = reg.register(entry("k", true)).unwrap();

        assert!(!reg.remove_entry("k", &old));
        assert!(reg.contains("k"));
        assert!(reg.remove_entry("k", &fresh));
        assert!(!reg.contains("k"));
    }

    #[test]
    fn keys_are_sorted() {
        let reg = Registry::new();
        for k in ["c", "a", "b"] {
            reg.register(entry(k, false)).unwrap();
        }
        assert_eq!(reg.keys(), vec!["a", "b", "c"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn racing_registrations_have_one_winner() {
        const N: usize = 12;
        let reg = Arc::new(Registry::new());
        let barrier = Arc::new(Barrier::new(N));

        let ok = (0..N)
            .map(|_| {
                let reg = Arc::clone(&reg);
                let b = Arc::clone(&barrier);
                thread::spawn(move || {
                    b.wait();
                    reg.register(entry("shared", false)).is_ok()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(ok, 1);
        assert_eq!(reg.len(), 1);
    }
}
