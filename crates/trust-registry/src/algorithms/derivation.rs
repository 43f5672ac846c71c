//! # Child Address Derivation
//!
//! A child unit's address is the hash of the state it was deployed with:
//! the registry's child code plus initial data `(registry address, index)`.
//! Anyone holding the same three inputs computes the same address, and no
//! one can occupy that address with different code or data.
//!
//! Pure functions. Nothing here is cached; every route calls in fresh.

use shared_types::{Address, Cell, CellBuilder, CellError, StateInit, INDEX_BITS};
use std::sync::Arc;

/// Initial data of the child unit with `index`.
pub fn child_data(index: u64, registry: &Address) -> Result<Cell, CellError> {
    let mut b = CellBuilder::new();
    b.store_address(registry)?.store_uint(index, INDEX_BITS)?;
    Ok(b.build())
}

/// State init a correctly deployed child unit with `index` has.
pub fn child_state_init(
    index: u64,
    child_code: &Arc<Cell>,
    registry: &Address,
) -> Result<StateInit, CellError> {
    Ok(StateInit::new(
        Arc::clone(child_code),
        Arc::new(child_data(index, registry)?),
    ))
}

/// Canonical address of the child unit with `index`, on the registry's
/// workchain.
///
/// Fails only when `index` does not fit the index width.
pub fn derive_child_address(
    index: u64,
    child_code: &Arc<Cell>,
    registry: &Address,
) -> Result<Address, CellError> {
    child_state_init(index, child_code, registry)?.address(registry.workchain)
}
