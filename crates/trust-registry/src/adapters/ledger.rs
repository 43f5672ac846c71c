//! In-Memory Ledger
//!
//! Implements `MessageTransport` port with a queue of pending messages and a
//! set of deployed accounts. Delivery is explicit: nothing moves until
//! [`InMemoryLedger::route_pending`] is called, so tests can inspect every
//! hop.
//!
//! Delivery rules:
//! - a message carrying a state init deploys its destination first;
//! - a message to a deployed account lands in that account's inbox;
//! - a bounceable message to a missing account returns to its source as a
//!   bounced message whose body is `0xFFFFFFFF` plus the first 256 bits of
//!   the original body;
//! - anything else is dropped.

use crate::domain::TransportError;
use crate::ports::outbound::MessageTransport;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    Address, Cell, CellBuilder, CellError, InboundMessage, OutboundMessage, StateInit,
    BOUNCE_PREFIX, OPCODE_BITS,
};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Bits of the original body kept in a bounced message.
pub const BOUNCED_BODY_BITS: usize = 256;

/// A message handed to its destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Account that received the message.
    pub destination: Address,
    /// The message as the destination observes it.
    pub message: InboundMessage,
}

#[derive(Clone, Debug)]
struct Envelope {
    source: Address,
    msg: OutboundMessage,
}

/// Deployed account. Plain accounts have no state init.
#[derive(Clone, Debug, Default)]
struct Account {
    state_init: Option<StateInit>,
}

/// In-memory message ledger for testing.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<Address, Account>>,
    queue: RwLock<VecDeque<Envelope>>,
    inboxes: RwLock<HashMap<Address, Vec<InboundMessage>>>,
    closed: RwLock<bool>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a plain account, e.g. an authority or the registry itself.
    pub fn register(&self, address: Address) {
        self.accounts.write().entry(address).or_default();
    }

    /// Check whether `address` holds a deployed account.
    pub fn is_deployed(&self, address: &Address) -> bool {
        self.accounts.read().contains_key(address)
    }

    /// State init an account was deployed with, if any.
    pub fn deployed_state(&self, address: &Address) -> Option<StateInit> {
        self.accounts
            .read()
            .get(address)
            .and_then(|a| a.state_init.clone())
    }

    /// Stop accepting messages.
    pub fn close(&self) {
        *self.closed.write() = true;
    }

    /// Number of queued, undelivered messages.
    pub fn pending_count(&self) -> usize {
        self.queue.read().len()
    }

    /// Messages delivered to `address` so far.
    pub fn inbox(&self, address: &Address) -> Vec<InboundMessage> {
        self.inboxes
            .read()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Drain the inbox of `address`.
    pub fn take_inbox(&self, address: &Address) -> Vec<InboundMessage> {
        self.inboxes.write().remove(address).unwrap_or_default()
    }

    /// Deliver every message queued so far, in order.
    ///
    /// Returns the deliveries made, bounces included. Messages queued while
    /// this runs wait for the next call.
    pub fn route_pending(&self) -> Vec<Delivery> {
        let batch: Vec<Envelope> = self.queue.write().drain(..).collect();
        let mut deliveries = Vec::with_capacity(batch.len());

        for Envelope { source, msg } in batch {
            if let Some(delivery) = self.deliver(source, msg) {
                self.inboxes
                    .write()
                    .entry(delivery.destination)
                    .or_default()
                    .push(delivery.message.clone());
                deliveries.push(delivery);
            }
        }
        deliveries
    }

    fn deliver(&self, source: Address, msg: OutboundMessage) -> Option<Delivery> {
        let destination = msg.destination;
        {
            let mut accounts = self.accounts.write();
            if !accounts.contains_key(&destination) {
                if let Some(init) = &msg.state_init {
                    info!("[registry] Deploying account {}", destination.short());
                    accounts.insert(
                        destination,
                        Account {
                            state_init: Some(init.clone()),
                        },
                    );
                }
            }
        }

        if self.is_deployed(&destination) {
            debug!(
                "[registry] Delivered {} -> {}",
                source.short(),
                destination.short()
            );
            return Some(Delivery {
                destination,
                message: InboundMessage::new(source, msg.value, msg.body),
            });
        }

        if !msg.bounce {
            warn!(
                "[registry] Dropping non-bounceable message to missing account {}",
                destination.short()
            );
            return None;
        }

        match bounced_body(&msg.body) {
            Ok(body) => {
                debug!(
                    "[registry] Bouncing message to missing account {} back to {}",
                    destination.short(),
                    source.short()
                );
                Some(Delivery {
                    destination: source,
                    message: InboundMessage::bounced(destination, msg.value, body),
                })
            }
            Err(e) => {
                warn!("[registry] Cannot build bounce body: {}", e);
                None
            }
        }
    }
}

/// Body of a bounced message: the bounce prefix followed by the head of the
/// original body. References are not carried.
pub fn bounced_body(original: &Cell) -> Result<Cell, CellError> {
    let mut b = CellBuilder::new();
    b.store_uint(u64::from(BOUNCE_PREFIX), OPCODE_BITS)?;

    let mut s = original.slice();
    let take = s.remaining_bits().min(BOUNCED_BODY_BITS);
    for _ in 0..take {
        b.store_bit(s.load_bit()?)?;
    }
    Ok(b.build())
}

#[async_trait]
impl MessageTransport for InMemoryLedger {
    async fn send_batch(
        &self,
        source: Address,
        batch: Vec<OutboundMessage>,
    ) -> Result<(), TransportError> {
        if *self.closed.read() {
            return Err(TransportError::Closed);
        }

        for msg in &batch {
            if let Some(init) = &msg.state_init {
                let derived = init
                    .address(msg.destination.workchain)
                    .map_err(|_| TransportError::StateInitMismatch(msg.destination))?;
                if derived != msg.destination {
                    return Err(TransportError::StateInitMismatch(msg.destination));
                }
            }
        }

        debug!(
            "[registry] Queued {} message(s) from {}",
            batch.len(),
            source.short()
        );
        self.queue
            .write()
            .extend(batch.into_iter().map(|msg| Envelope { source, msg }));
        Ok(())
    }
}
