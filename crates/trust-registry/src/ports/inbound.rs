//! # Inbound Ports
//!
//! API trait defining what the trust registry can do.

use crate::domain::{RegistryError, RegistryState, TransactionReceipt};
use async_trait::async_trait;
use shared_types::{Address, InboundMessage};

/// Trust registry API - inbound port.
#[async_trait]
pub trait TrustRegistryApi: Send + Sync {
    /// Processes one inbound message as a single atomic transaction.
    ///
    /// On `Err` nothing was written and nothing was sent.
    async fn handle_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<TransactionReceipt, RegistryError>;

    /// Current decoded state.
    async fn registry_state(&self) -> Result<RegistryState, RegistryError>;

    /// Canonical address of the child unit with `index`.
    ///
    /// Computed whether or not `index` has been allocated.
    async fn child_address(&self, index: u64) -> Result<Address, RegistryError>;

    /// The registry's own address.
    fn registry_address(&self) -> Address;
}
