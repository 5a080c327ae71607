//! In-memory store adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::state::LimitState;
use crate::store::{Applied, AtomicStore, Transition};

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: LimitState,
    deadline_ms: u64,
}

/// Default store adapter backed by process memory.
///
/// Per-key linearizability comes from a single mutex around the map:
/// transitions are pure and never await, so the critical section stays
/// short. Expiry is lazy, the way a TTL-bearing backend behaves: an entry
/// past its deadline is presented as absent on the next access.
///
/// Suitable for single-process deployments and tests. Distributed
/// deployments implement [`AtomicStore`] against a shared backend instead.
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Build a store against an injected clock, for deterministic expiry in
    /// tests. Use the same clock handle the engine uses.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Arc::new(Mutex::new(HashMap::new())), clock }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now_millis();
        let entries = self.entries.lock().expect("store mutex poisoned");
        entries.values().filter(|entry| entry.deadline_ms > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries eagerly. Expiry is otherwise lazy, on access.
    pub fn purge_expired(&self) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.retain(|_, entry| entry.deadline_ms > now);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AtomicStore for InMemoryStore {
    async fn apply(
        &self,
        key: &str,
        ttl: Duration,
        transition: Transition,
    ) -> Result<Applied, StoreError> {
        let now = self.clock.now_millis();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);

        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let current =
            entries.get(key).filter(|entry| entry.deadline_ms > now).map(|entry| entry.state);
        let (state, verdict) = transition(current);
        entries
            .insert(key.to_string(), Entry { state, deadline_ms: now.saturating_add(ttl_ms) });
        Ok(Applied { state, verdict })
    }

    async fn get(&self, key: &str) -> Result<Option<LimitState>, StoreError> {
        let now = self.clock.now_millis();
        let entries = self.entries.lock().expect("store mutex poisoned");
        Ok(entries.get(key).filter(|entry| entry.deadline_ms > now).map(|entry| entry.state))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}
