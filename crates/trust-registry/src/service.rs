//! # Trust Registry Service
//!
//! Runs each inbound message as one atomic transaction against the state
//! store and the message transport.
//!
//! ## Transaction Model
//!
//! 1. Load and decode the persisted record
//! 2. Dispatch (pure; produces a [`Transaction`] or a rejection)
//! 3. Commit the successor state, if any
//! 4. Hand the outbound actions to the transport as one batch
//!
//! A rejection at step 2 writes nothing and sends nothing. A transport
//! failure at step 4 restores the record read at step 1; if that restore
//! also fails the error is [`RegistryError::StateDiverged`]. Transactions
//! and state queries share one async mutex, so no caller observes the
//! intermediate state.
//!
//! ## Security
//!
//! - The sender is taken from the inbound envelope only
//! - Child identity is recomputed from the persisted record on every message

use crate::algorithms::{derive_child_address, dispatch, RouteContext};
use crate::domain::{
    RegistryConfig, RegistryError, RegistryState, StoreError, Transaction, TransactionKind,
    TransactionReceipt, TransportError,
};
use crate::ports::inbound::TrustRegistryApi;
use crate::ports::outbound::{MessageTransport, StateStore};

use async_trait::async_trait;
use shared_types::{Address, Cell, InboundMessage};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Statistics for the Trust Registry Service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Inbound messages processed.
    pub messages_received: u64,
    /// Messages with an empty body.
    pub noops: u64,
    /// Reports forwarded to the authority.
    pub conveyed_up: u64,
    /// Commands forwarded to child units.
    pub conveyed_down: u64,
    /// Child units allocated.
    pub units_allocated: u64,
    /// Bounces turned into failure notices.
    pub bounces_handled: u64,
    /// Transactions aborted by a protocol rejection.
    pub rejected: u64,
    /// Transactions aborted by a store or transport failure.
    pub infra_failures: u64,
    /// Committed states restored after a transport failure.
    pub rollbacks: u64,
}

impl ServiceStats {
    fn record(&mut self, kind: TransactionKind) {
        match kind {
            TransactionKind::Noop => self.noops += 1,
            TransactionKind::ConveyUp => self.conveyed_up += 1,
            TransactionKind::ConveyDown => self.conveyed_down += 1,
            TransactionKind::Allocate => self.units_allocated += 1,
            TransactionKind::Bounce => self.bounces_handled += 1,
        }
    }
}

/// The trust registry.
///
/// Owns no state of its own beyond statistics: the record lives in `S`,
/// outbound messages leave through `T`.
pub struct TrustRegistryService<S: StateStore, T: MessageTransport> {
    /// The registry's own address.
    address: Address,
    /// Service configuration.
    config: RegistryConfig,
    /// Persistent record.
    store: Arc<S>,
    /// Outbound delivery.
    transport: Arc<T>,
    /// Serializes transactions.
    tx_lock: Mutex<()>,
    /// Service statistics.
    stats: Arc<RwLock<ServiceStats>>,
}

impl<S: StateStore, T: MessageTransport> TrustRegistryService<S, T> {
    /// Create a service for the registry at `address`.
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        address: Address,
        config: RegistryConfig,
        store: Arc<S>,
        transport: Arc<T>,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        info!(
            "[registry] Service for {} (up: {}, down: {}, allocate: {}, bounce: {})",
            address.short(),
            config.value_policy.upward,
            config.value_policy.downward,
            config.value_policy.allocate,
            config.value_policy.bounce
        );
        Ok(Self {
            address,
            config,
            store,
            transport,
            tx_lock: Mutex::new(()),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        })
    }

    /// Write the initial record: `authority`, nothing allocated, `child_code`.
    ///
    /// Deployment happens once; an existing record is never replaced.
    pub async fn deploy(
        &self,
        authority: Address,
        child_code: Arc<Cell>,
    ) -> Result<(), RegistryError> {
        let _guard = self.tx_lock.lock().await;

        match self.store.load().await {
            Ok(_) => return Err(StoreError::AlreadyInitialized.into()),
            Err(StoreError::NotInitialized) => {}
            Err(e) => return Err(e.into()),
        }

        let state = RegistryState::new(authority, child_code);
        self.store.commit(state.to_persisted()?).await?;
        info!(
            "[registry] Deployed {} with authority {}",
            self.address.short(),
            authority.short()
        );
        Ok(())
    }

    /// Active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    #[instrument(
        skip(self, msg),
        fields(
            sender = %msg.sender.short(),
            bounced = msg.bounced,
            correlation_id = tracing::field::Empty,
        )
    )]
    async fn process(&self, msg: InboundMessage) -> Result<TransactionReceipt, RegistryError> {
        let _guard = self.tx_lock.lock().await;
        self.stats.write().await.messages_received += 1;

        match self.run(&msg).await {
            Ok(receipt) => {
                self.stats.write().await.record(receipt.kind);
                Ok(receipt)
            }
            Err(e) if e.is_infrastructure() => {
                error!(exit_code = e.exit_code(), error = %e, "Transaction failed");
                self.stats.write().await.infra_failures += 1;
                Err(e)
            }
            Err(e) => {
                warn!(exit_code = e.exit_code(), error = %e, "Transaction rejected");
                self.stats.write().await.rejected += 1;
                Err(e)
            }
        }
    }

    async fn run(&self, msg: &InboundMessage) -> Result<TransactionReceipt, RegistryError> {
        let persisted = self.store.load().await?;
        let state = RegistryState::from_persisted(&persisted)?;

        let ctx = RouteContext {
            registry: self.address,
            state: &state,
            config: &self.config,
        };
        let tx = dispatch(&ctx, msg)?;
        tracing::Span::current().record("correlation_id", tx.correlation_id);

        if let Some(next) = &tx.new_state {
            self.store.commit(next.to_persisted()?).await?;
        }

        if let Err(transport) = self.release(&tx).await {
            if tx.new_state.is_some() {
                warn!(error = %transport, "Transport failed after commit; restoring state");
                if let Err(store) = self.store.commit(persisted).await {
                    error!(
                        transport = %transport,
                        store = %store,
                        "Restore failed; stored state diverged from sent messages"
                    );
                    return Err(RegistryError::StateDiverged { transport, store });
                }
                self.stats.write().await.rollbacks += 1;
            }
            return Err(transport.into());
        }

        debug!(
            kind = ?tx.kind,
            actions = tx.actions.len(),
            state_changed = tx.new_state.is_some(),
            "Transaction committed"
        );
        Ok(tx.receipt())
    }

    async fn release(&self, tx: &Transaction) -> Result<(), TransportError> {
        if tx.actions.is_empty() {
            return Ok(());
        }
        self.transport
            .send_batch(self.address, tx.actions.clone())
            .await
    }

    async fn load_state(&self) -> Result<RegistryState, RegistryError> {
        let _guard = self.tx_lock.lock().await;
        let persisted = self.store.load().await?;
        RegistryState::from_persisted(&persisted)
    }
}

// =============================================================================
// TrustRegistryApi Implementation
// =============================================================================

#[async_trait]
impl<S: StateStore, T: MessageTransport> TrustRegistryApi for TrustRegistryService<S, T> {
    async fn handle_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<TransactionReceipt, RegistryError> {
        self.process(msg).await
    }

    async fn registry_state(&self) -> Result<RegistryState, RegistryError> {
        self.load_state().await
    }

    async fn child_address(&self, index: u64) -> Result<Address, RegistryError> {
        let state = self.load_state().await?;
        Ok(derive_child_address(
            index,
            &state.child_code,
            &self.address,
        )?)
    }

    fn registry_address(&self) -> Address {
        self.address
    }
}

// =============================================================================
// TESTS
// =============================================================================
