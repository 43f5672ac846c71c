//! # Message Envelopes
//!
//! What the delivery substrate hands to an account (`InboundMessage`) and
//! what an account hands back to it (`OutboundMessage`).
//!
//! ## Security Properties
//!
//! - **Envelope Authority**: `InboundMessage::sender` is filled in by the
//!   substrate and is the sole source of truth for the sender's identity.
//! - **Bounce Flag**: only the substrate sets `bounced`; a body can never
//!   claim to be a bounce.

use crate::cell::{Cell, CellBuilder};
use crate::entities::{Address, Coins};
use crate::errors::CellError;
use std::sync::Arc;

/// Initial code and data of an account. Its representation hash is the
/// account address, which is what makes addresses derivable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    /// Executable code.
    pub code: Arc<Cell>,
    /// Initial persistent data.
    pub data: Arc<Cell>,
}

impl StateInit {
    /// Creates a state init from code and data cells.
    #[must_use]
    pub fn new(code: Arc<Cell>, data: Arc<Cell>) -> Self {
        Self { code, data }
    }

    /// Serializes as `split_depth:0 special:0 code:1 data:1 library:0`
    /// followed by the code and data references.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(0b00110, 5)?
            .store_ref(Arc::clone(&self.code))?
            .store_ref(Arc::clone(&self.data))?;
        Ok(b.build())
    }

    /// Address an account deployed with this state init gets on `workchain`.
    pub fn address(&self, workchain: i8) -> Result<Address, CellError> {
        Ok(Address::new(workchain, self.to_cell()?.hash()))
    }
}

/// A message as received by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Authenticated sender identity.
    pub sender: Address,
    /// Set by the substrate when this is a returned, undeliverable message.
    pub bounced: bool,
    /// Value attached to the message.
    pub value: Coins,
    /// Message body.
    pub body: Cell,
}

impl InboundMessage {
    /// Creates a regular (non-bounced) inbound message.
    #[must_use]
    pub fn new(sender: Address, value: Coins, body: Cell) -> Self {
        Self {
            sender,
            bounced: false,
            value,
            body,
        }
    }

    /// Creates a bounced inbound message.
    #[must_use]
    pub fn bounced(sender: Address, value: Coins, body: Cell) -> Self {
        Self {
            sender,
            bounced: true,
            value,
            body,
        }
    }
}

/// A message emitted by an account. Sending is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient.
    pub destination: Address,
    /// Value to attach.
    pub value: Coins,
    /// Whether the substrate returns the message to the sender on failure.
    pub bounce: bool,
    /// Message body.
    pub body: Cell,
    /// Present only when the message deploys its destination.
    pub state_init: Option<StateInit>,
}

impl OutboundMessage {
    /// Creates a message to an existing account.
    #[must_use]
    pub fn new(destination: Address, value: Coins, bounce: bool, body: Cell) -> Self {
        Self {
            destination,
            value,
            bounce,
            body,
            state_init: None,
        }
    }

    /// Attaches a state init so the message deploys its destination.
    #[must_use]
    pub fn with_state_init(mut self, state_init: StateInit) -> Self {
        self.state_init = Some(state_init);
        self
    }
}
