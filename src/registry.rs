//! Best-effort registry of keys with live state in the store.
//!
//! Advisory only: the store's TTL is authoritative for liveness, so entries
//! here may reference keys that have already expired. The registry is
//! exposed read-only for monitoring and enumeration and must never be
//! consulted for admission decisions.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Trait for active-key registries (injectable into the engine).
pub trait KeyRegistry: Send + Sync + std::fmt::Debug {
    /// Record a key. Called on every decision, allowed or denied.
    fn insert(&self, key: String);
    /// Forget a key. Called on reset.
    fn remove(&self, key: &str);
    /// Whether a key has been seen and not reset since.
    fn contains(&self, key: &str) -> bool;
    /// Snapshot of known keys, sorted.
    fn snapshot(&self) -> Vec<String>;
    /// Number of known keys.
    fn len(&self) -> usize;
    /// True when no keys are known.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory implementation backed by an RwLock.
#[derive(Default, Clone, Debug)]
pub struct InMemoryKeyRegistry {
    inner: Arc<RwLock<HashSet<String>>>,
}

/// Default registry used when none is injected.
pub type DefaultKeyRegistry = InMemoryKeyRegistry;

impl KeyRegistry for InMemoryKeyRegistry {
    fn insert(&self, key: String) {
        let mut keys = self.inner.write().expect("key registry poisoned");
        keys.insert(key);
    }

    fn remove(&self, key: &str) {
        let mut keys = self.inner.write().expect("key registry poisoned");
        keys.remove(key);
    }

    fn contains(&self, key: &str) -> bool {
        let keys = self.inner.read().expect("key registry poisoned");
        keys.contains(key)
    }

    fn snapshot(&self) -> Vec<String> {
        let keys = self.inner.read().expect("key registry poisoned");
        let mut entries: Vec<String> = keys.iter().cloned().collect();
        entries.sort();
        entries
    }

    fn len(&self) -> usize {
        let keys = self.inner.read().expect("key registry poisoned");
        keys.len()
    }
}
