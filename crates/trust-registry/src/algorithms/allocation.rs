//! # Unit Allocation
//!
//! The only route that changes persistent state. The authority asks for a
//! new child unit; the registry reserves `next_index`, derives the unit's
//! address and deploys it by attaching the state init to a bounceable
//! message carrying the request.
//!
//! The successor state travels inside the returned [`Transaction`], so the
//! counter moves only if the whole transaction is committed.

use super::derivation::child_state_init;
use super::dispatcher::RouteContext;
use crate::domain::{invariant_sender_is, RegistryError, Transaction, TransactionKind};
use shared_types::{Address, AllocateRequest, Coins, OutboundMessage};
use std::sync::Arc;

/// Allocates and deploys the next child unit.
///
/// 1. `sender == authority`, else `SenderMismatch`
/// 2. `next_index < MAX_UNITS`, else `CapacityExhausted`
pub fn allocate(
    ctx: &RouteContext<'_>,
    request: &AllocateRequest,
    sender: &Address,
    value: Coins,
) -> Result<Transaction, RegistryError> {
    invariant_sender_is(&ctx.state.authority, sender)?;

    let (index, next) = ctx.state.allocate()?;
    let init = child_state_init(index, &ctx.state.child_code, &ctx.registry)?;
    let target = init.address(ctx.registry.workchain)?;

    let body = AllocateRequest {
        correlation_id: request.correlation_id,
        init_payload: Arc::clone(&request.init_payload),
    }
    .to_cell()?;

    let action = OutboundMessage::new(
        target,
        ctx.config.value_policy.allocate.outbound_value(value),
        true,
        body,
    )
    .with_state_init(init);

    Ok(Transaction {
        new_state: Some(next),
        ..Transaction::route(TransactionKind::Allocate, request.correlation_id, action)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::derive_child_address;
    use crate::algorithms::test_support::*;
    use crate::domain::MAX_UNITS;

    fn request(correlation_id: u64) -> AllocateRequest {
        AllocateRequest {
            correlation_id,
            init_payload: payload(0x5EED),
        }
    }

    #[test]
    fn test_allocate_first_unit() {
        let state = state(0);
        let config = config();
        let ctx = RouteContext {
            registry: registry(),
            state: &state,
            config: &config,
        };
        let tx = allocate(&ctx, &request(42), &authority(), 1_000).unwrap();

        assert_eq!(tx.kind, TransactionKind::Allocate);
        assert_eq!(tx.correlation_id, 42);
        assert_eq!(tx.new_state.as_ref().map(|s| s.next_index), Some(1));

        let action = &tx.actions[0];
        assert_eq!(
            action.destination,
            derive_child_address(0, &child_code(), &registry()).unwrap()
        );
        assert!(action.bounce);
        assert_eq!(action.value, 1_000);

        let init = action.state_init.as_ref().unwrap();
        assert_eq!(init.address(0).unwrap(), action.destination);

        let mut s = action.body.slice();
        let header = shared_types::MessageHeader::load(&mut s).unwrap();
        let echoed = AllocateRequest::load_tail(header, &mut s).unwrap();
        assert_eq!(echoed, request(42));
    }

    #[test]
    fn test_allocate_leaves_input_state_untouched() {
        let state = state(7);
        let config = config();
        let ctx = RouteContext {
            registry: registry(),
            state: &state,
            config: &config,
        };
        let tx = allocate(&ctx, &request(1), &authority(), 0).unwrap();
        assert_eq!(state.next_index, 7);
        assert_eq!(tx.new_state.unwrap().next_index, 8);
    }

    #[test]
    fn test_allocate_requires_authority() {
        let state = state(0);
        let config = config();
        let ctx = RouteContext {
            registry: registry(),
            state: &state,
            config: &config,
        };
        let result = allocate(&ctx, &request(1), &stranger(), 0);
        assert!(matches!(result, Err(RegistryError::SenderMismatch { .. })));
    }

    #[test]
    fn test_allocate_at_capacity() {
        let state = state(MAX_UNITS);
        let config = config();
        let ctx = RouteContext {
            registry: registry(),
            state: &state,
            config: &config,
        };
        assert_eq!(
            allocate(&ctx, &request(1), &authority(), 0),
            Err(RegistryError::CapacityExhausted {
                next_index: MAX_UNITS
            })
        );
    }

    #[test]
    fn test_last_index_allocatable() {
        let state = state(MAX_UNITS - 1);
        let config = config();
        let ctx = RouteContext {
            registry: registry(),
            state: &state,
            config: &config,
        };
        let tx = allocate(&ctx, &request(1), &authority(), 0).unwrap();
        assert_eq!(tx.new_state.unwrap().next_index, MAX_UNITS);
    }
}
