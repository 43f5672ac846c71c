//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits for state persistence and message
//! delivery.

mod ledger;
mod state_store;

pub use ledger::{bounced_body, Delivery, InMemoryLedger, BOUNCED_BODY_BITS};
pub use state_store::InMemoryStateStore;
