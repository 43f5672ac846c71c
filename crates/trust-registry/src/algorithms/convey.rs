//! # Convey Routes
//!
//! Upward: child unit -> registry -> authority.
//! Downward: authority -> registry -> child unit.
//!
//! Neither route touches persistent state. The check order is part of the
//! protocol: it decides which error a doubly-invalid message gets.

use super::derivation::derive_child_address;
use super::dispatcher::RouteContext;
use crate::domain::{
    invariant_index_allocated, invariant_sender_is, RegistryError, Transaction, TransactionKind,
};
use shared_types::{Address, AuthorityReport, ChildCommand, Coins, ConveyRequest, OutboundMessage};
use std::sync::Arc;

/// Forwards a child unit's report to the authority.
///
/// 1. `index < next_index`, else `IndexOutOfRange`
/// 2. `sender == derive(index)`, else `SenderMismatch`
pub fn convey_up(
    ctx: &RouteContext<'_>,
    request: &ConveyRequest,
    sender: &Address,
    value: Coins,
) -> Result<Transaction, RegistryError> {
    invariant_index_allocated(request.index, ctx.state.next_index)?;

    let expected = derive_child_address(request.index, &ctx.state.child_code, &ctx.registry)?;
    invariant_sender_is(&expected, sender)?;

    let body = AuthorityReport {
        method: request.method,
        correlation_id: request.correlation_id,
        index: request.index,
        payload: Arc::clone(&request.payload),
    }
    .to_cell()?;

    let action = OutboundMessage::new(
        ctx.state.authority,
        ctx.config.value_policy.upward.outbound_value(value),
        ctx.config.bounceable_reports,
        body,
    );
    Ok(Transaction::route(
        TransactionKind::ConveyUp,
        request.correlation_id,
        action,
    ))
}

/// Forwards an authority command to the child unit it names.
///
/// 1. `sender == authority`, else `SenderMismatch`
/// 2. `index < next_index`, else `IndexOutOfRange`
///
/// The forward is bounceable so a missing target comes back as a bounce.
pub fn convey_down(
    ctx: &RouteContext<'_>,
    request: &ConveyRequest,
    sender: &Address,
    value: Coins,
) -> Result<Transaction, RegistryError> {
    invariant_sender_is(&ctx.state.authority, sender)?;
    invariant_index_allocated(request.index, ctx.state.next_index)?;

    let target = derive_child_address(request.index, &ctx.state.child_code, &ctx.registry)?;

    let body = ChildCommand {
        method: request.method,
        correlation_id: request.correlation_id,
        payload: Arc::clone(&request.payload),
    }
    .to_cell()?;

    let action = OutboundMessage::new(
        target,
        ctx.config.value_policy.downward.outbound_value(value),
        true,
        body,
    );
    Ok(Transaction::route(
        TransactionKind::ConveyDown,
        request.correlation_id,
        action,
    ))
}
