//! # Bounce Handling
//!
//! A bounced message means a forward did not reach its target, usually a
//! child unit that was never deployed. The authority funded the original
//! request, so it gets a failure notice with whatever value came back.
//!
//! The original correlation cannot be recovered reliably from a returned
//! body, so the notice always carries correlation `0`.

use super::dispatcher::RouteContext;
use crate::domain::{RegistryError, Transaction, TransactionKind};
use shared_types::{Coins, ExcessesNotice, OutboundMessage};

/// Correlation value carried by every failure notice.
pub const BOUNCE_CORRELATION_ID: u64 = 0;

/// Turns a bounce into exactly one non-bounceable excesses notice to the
/// authority.
pub fn handle_bounce(ctx: &RouteContext<'_>, value: Coins) -> Result<Transaction, RegistryError> {
    let body = ExcessesNotice {
        correlation_id: BOUNCE_CORRELATION_ID,
    }
    .to_cell()?;

    // Non-bounceable: a failed notice must not come back as another bounce.
    let action = OutboundMessage::new(
        ctx.state.authority,
        ctx.config.value_policy.bounce.outbound_value(value),
        false,
        body,
    );
    Ok(Transaction::route(
        TransactionKind::Bounce,
        BOUNCE_CORRELATION_ID,
        action,
    ))
}
