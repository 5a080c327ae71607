//! Atomic store port: linearizable read-modify-write with expiry.
//!
//! This is the seam between the engine and whatever shared backend holds
//! the per-key state. The port has no algorithm knowledge: it executes the
//! transition function it is handed and persists whatever comes back, so a
//! decision costs exactly one round trip.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::algorithm::Verdict;
use crate::error::StoreError;
use crate::state::LimitState;

/// Transition function executed atomically by a store adapter.
///
/// `None` means the key is absent (or expired); the function defines the
/// initial state in that case.
pub type Transition = Box<dyn FnOnce(Option<LimitState>) -> (LimitState, Verdict) + Send>;

/// Result of one atomic apply: the persisted state plus the auxiliary
/// verdict the transition computed alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub state: LimitState,
    pub verdict: Verdict,
}

/// Abstract contract for atomic read-modify-write against a single keyed
/// state blob, with expiry.
///
/// Adapters must guarantee per-key linearizability: for a fixed key, all
/// `apply` calls are observed in a single total order, and no caller sees
/// an intermediate state. There is no ordering guarantee across keys.
/// An adapter can meet the contract with a transactional/scripted command,
/// an optimistic compare-and-swap retry loop, or an actor owning the key.
///
/// Failures surface as [`StoreError`]; an adapter never reports a
/// partially-applied state.
#[async_trait]
pub trait AtomicStore: Send + Sync {
    /// Atomically apply `transition` to the key's state, persist the new
    /// state, and (re)set its expiry to `ttl`.
    async fn apply(
        &self,
        key: &str,
        ttl: Duration,
        transition: Transition,
    ) -> Result<Applied, StoreError>;

    /// Read the current state without mutating it or refreshing its expiry.
    async fn get(&self, key: &str) -> Result<Option<LimitState>, StoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
