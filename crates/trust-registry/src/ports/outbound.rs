//! # Outbound Ports
//!
//! Traits for external dependencies (persistent storage, message delivery).

use crate::domain::{PersistedState, StoreError, TransportError};
use async_trait::async_trait;
use shared_types::{Address, OutboundMessage};

/// Persistent record storage - outbound port.
///
/// Holds exactly one record: the registry's encoded state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the current record.
    async fn load(&self) -> Result<PersistedState, StoreError>;

    /// Replaces the current record.
    async fn commit(&self, state: PersistedState) -> Result<(), StoreError>;
}

/// Message delivery - outbound port.
///
/// Fire-and-forget: `Ok` means the batch was accepted for delivery, not
/// that any destination processed it. Failures at a destination come back
/// later as bounced inbound messages.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Queues every message in `batch` for delivery from `source`, in order.
    ///
    /// All or nothing: on `Err` no message of the batch was queued.
    async fn send_batch(
        &self,
        source: Address,
        batch: Vec<OutboundMessage>,
    ) -> Result<(), TransportError>;
}
