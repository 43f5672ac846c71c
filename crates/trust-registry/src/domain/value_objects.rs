//! # Domain Value Objects
//!
//! Decoded operations and transaction outcomes.

use super::errors::RegistryError;
use super::state::RegistryState;
use shared_types::{op, OutboundMessage};

/// Recognized operations. Closed set; anything else is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Allocate the next child index.
    Allocate,
    /// Child unit to authority.
    ConveyUp,
    /// Authority to child unit.
    ConveyDown,
}

impl TryFrom<u32> for Operation {
    type Error = RegistryError;

    fn try_from(opcode: u32) -> Result<Self, Self::Error> {
        match opcode {
            op::ALLOCATE => Ok(Self::Allocate),
            op::CONVEY_UP => Ok(Self::ConveyUp),
            op::CONVEY_DOWN => Ok(Self::ConveyDown),
            other => Err(RegistryError::UnrecognizedOperation(other)),
        }
    }
}

impl From<Operation> for u32 {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Allocate => op::ALLOCATE,
            Operation::ConveyUp => op::CONVEY_UP,
            Operation::ConveyDown => op::CONVEY_DOWN,
        }
    }
}

/// Which branch a transaction took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Empty body, nothing to do.
    Noop,
    /// Report forwarded to the authority.
    ConveyUp,
    /// Command forwarded to a child unit.
    ConveyDown,
    /// New unit allocated and deployed.
    Allocate,
    /// Failure notice sent after a bounce.
    Bounce,
}

/// Result of processing one inbound message. Nothing in here has happened
/// yet: the caller commits `new_state` and releases `actions` only once the
/// whole transaction succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Branch taken.
    pub kind: TransactionKind,
    /// Correlation carried by the outbound actions.
    pub correlation_id: u64,
    /// Messages to emit.
    pub actions: Vec<OutboundMessage>,
    /// Successor state; `None` when the transaction mutates nothing.
    pub new_state: Option<RegistryState>,
}

impl Transaction {
    /// A transaction with no effect.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            kind: TransactionKind::Noop,
            correlation_id: 0,
            actions: Vec::new(),
            new_state: None,
        }
    }

    /// A pure routing step: one outbound message, no state change.
    #[must_use]
    pub fn route(kind: TransactionKind, correlation_id: u64, action: OutboundMessage) -> Self {
        Self {
            kind,
            correlation_id,
            actions: vec![action],
            new_state: None,
        }
    }

    /// Receipt for this transaction once it has been committed.
    #[must_use]
    pub fn receipt(&self) -> TransactionReceipt {
        TransactionReceipt {
            kind: self.kind,
            correlation_id: self.correlation_id,
            actions: self.actions.clone(),
            state_changed: self.new_state.is_some(),
        }
    }
}

/// What a committed transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Branch taken.
    pub kind: TransactionKind,
    /// Correlation carried by the released actions.
    pub correlation_id: u64,
    /// Messages handed to the transport, in order.
    pub actions: Vec<OutboundMessage>,
    /// True if a successor state was written.
    pub state_changed: bool,
}
