//! # Message Dispatcher
//!
//! Entry point for every inbound message:
//!
//! ```text
//! empty body        -> no-op
//! bounced flag      -> bounce handler (body not decoded)
//! op:32 corr:64 ... -> allocate | convey up | convey down | reject
//! ```

use super::{allocate, convey_down, convey_up, handle_bounce};
use crate::domain::{Operation, RegistryConfig, RegistryError, RegistryState, Transaction};
use shared_types::{Address, AllocateRequest, ConveyRequest, InboundMessage, MessageHeader};

/// Everything a route may read while processing one message.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// The registry's own address.
    pub registry: Address,
    /// State loaded for this transaction.
    pub state: &'a RegistryState,
    /// Active configuration.
    pub config: &'a RegistryConfig,
}

/// Decodes and routes one inbound message.
pub fn dispatch(ctx: &RouteContext<'_>, msg: &InboundMessage) -> Result<Transaction, RegistryError> {
    if msg.body.is_empty() {
        return Ok(Transaction::noop());
    }

    // The remainder of a returned body has no guaranteed format.
    if msg.bounced {
        return handle_bounce(ctx, msg.value);
    }

    let mut slice = msg.body.slice();
    let header = MessageHeader::load(&mut slice)?;

    match Operation::try_from(header.opcode)? {
        Operation::ConveyUp => {
            let request = ConveyRequest::load_tail(header, &mut slice)?;
            convey_up(ctx, &request, &msg.sender, msg.value)
        }
        Operation::ConveyDown => {
            let request = ConveyRequest::load_tail(header, &mut slice)?;
            convey_down(ctx, &request, &msg.sender, msg.value)
        }
        Operation::Allocate => {
            let request = AllocateRequest::load_tail(header, &mut slice)?;
            allocate(ctx, &request, &msg.sender, msg.value)
        }
    }
}
