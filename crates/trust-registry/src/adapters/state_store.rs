//! In-Memory State Store
//!
//! Implements `StateStore` port with a single in-process record.

use crate::domain::{PersistedState, StoreError};
use crate::ports::outbound::StateStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

/// In-memory state store for testing and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    record: RwLock<Option<PersistedState>>,
    commits: RwLock<u64>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `state`.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            record: RwLock::new(Some(state)),
            commits: RwLock::new(0),
        }
    }

    /// Current record without going through the port.
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.record.read().clone()
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        *self.commits.read()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<PersistedState, StoreError> {
        self.record.read().clone().ok_or(StoreError::NotInitialized)
    }

    async fn commit(&self, state: PersistedState) -> Result<(), StoreError> {
        debug!(
            "[registry] Committing state layout v{} ({} bits)",
            state.layout_version,
            state.data.bit_len()
        );
        *self.record.write() = Some(state);
        *self.commits.write() += 1;
        Ok(())
    }
}
