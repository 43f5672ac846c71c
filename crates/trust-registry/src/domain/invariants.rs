//! # Domain Invariants
//!
//! Checks every routing path is built from. Each returns the exact
//! rejection the protocol requires.

use super::errors::RegistryError;
use shared_types::{Address, MAX_WIRE_INDEX};

/// Maximum number of child units: the largest value a 50-bit counter holds.
pub const MAX_UNITS: u64 = MAX_WIRE_INDEX;

/// Invariant: a message may only name an allocated unit.
pub fn invariant_index_allocated(index: u64, next_index: u64) -> Result<(), RegistryError> {
    if index >= next_index {
        return Err(RegistryError::IndexOutOfRange { index, next_index });
    }
    Ok(())
}

/// Invariant: the observed sender is the identity the route requires.
///
/// Used with the authority address for downward routes and with the freshly
/// derived child address for upward routes. There is no other
/// authentication.
pub fn invariant_sender_is(expected: &Address, observed: &Address) -> Result<(), RegistryError> {
    if expected != observed {
        return Err(RegistryError::SenderMismatch {
            expected: *expected,
            observed: *observed,
        });
    }
    Ok(())
}

/// Invariant: the counter can still grow without leaving the index width.
pub fn invariant_within_capacity(next_index: u64) -> Result<(), RegistryError> {
    if next_index >= MAX_UNITS {
        return Err(RegistryError::CapacityExhausted { next_index });
    }
    Ok(())
}
