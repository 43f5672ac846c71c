//! # Registry State
//!
//! The only persistent data the registry owns. Everything else, including
//! every child unit address, is recomputed per message.
//!
//! Persisted layout, in this fixed order:
//!
//! ```text
//! authority:address  next_index:uint50  ^child_code
//! ```

use super::errors::RegistryError;
use super::invariants::invariant_within_capacity;
use shared_types::{Address, Cell, CellBuilder, CellError, INDEX_BITS};
use std::sync::Arc;

/// Decoded registry record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryState {
    /// Authority identity. Immutable after deployment.
    pub authority: Address,
    /// Number of child units allocated so far.
    pub next_index: u64,
    /// Code every child unit is deployed with.
    pub child_code: Arc<Cell>,
}

/// Record as held by a state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    /// Layout version of `data`.
    pub layout_version: u16,
    /// Encoded record.
    pub data: Arc<Cell>,
}

impl RegistryState {
    /// Current persisted layout version.
    pub const LAYOUT_VERSION: u16 = 1;

    /// Fresh state at deployment: nothing allocated.
    #[must_use]
    pub fn new(authority: Address, child_code: Arc<Cell>) -> Self {
        Self {
            authority,
            next_index: 0,
            child_code,
        }
    }

    /// Same record with a different allocation counter.
    pub fn with_next_index(mut self, next_index: u64) -> Result<Self, RegistryError> {
        if next_index > crate::domain::MAX_UNITS {
            return Err(RegistryError::CorruptState(format!(
                "next index {next_index} exceeds {}-bit index width",
                INDEX_BITS
            )));
        }
        self.next_index = next_index;
        Ok(self)
    }

    /// True if `index` names an allocated unit.
    #[must_use]
    pub fn is_allocated(&self, index: u64) -> bool {
        index < self.next_index
    }

    /// Reserves the next index. Returns it together with the successor state;
    /// `self` is left untouched so a failed transaction has nothing to undo.
    pub fn allocate(&self) -> Result<(u64, Self), RegistryError> {
        invariant_within_capacity(self.next_index)?;
        let index = self.next_index;
        let next = Self {
            next_index: index + 1,
            ..self.clone()
        };
        Ok((index, next))
    }

    /// Encodes the record.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_address(&self.authority)?
            .store_uint(self.next_index, INDEX_BITS)?
            .store_ref(Arc::clone(&self.child_code))?;
        Ok(b.build())
    }

    /// Decodes the record.
    pub fn from_cell(cell: &Cell) -> Result<Self, RegistryError> {
        let corrupt = |e: CellError| RegistryError::CorruptState(e.to_string());

        let mut s = cell.slice();
        let authority = s.load_address().map_err(corrupt)?;
        let next_index = s.load_uint(INDEX_BITS).map_err(corrupt)?;
        let child_code = s.load_ref().map_err(corrupt)?;
        if !s.is_exhausted() {
            return Err(RegistryError::CorruptState(format!(
                "{} trailing bits, {} trailing refs",
                s.remaining_bits(),
                s.remaining_refs()
            )));
        }

        Self::new(authority, child_code).with_next_index(next_index)
    }

    /// Wraps the encoded record with its layout version.
    pub fn to_persisted(&self) -> Result<PersistedState, RegistryError> {
        Ok(PersistedState {
            layout_version: Self::LAYOUT_VERSION,
            data: Arc::new(self.to_cell()?),
        })
    }

    /// Decodes a stored record, rejecting unknown layout versions.
    pub fn from_persisted(persisted: &PersistedState) -> Result<Self, RegistryError> {
        if persisted.layout_version != Self::LAYOUT_VERSION {
            return Err(RegistryError::CorruptState(format!(
                "unsupported layout version {}",
                persisted.layout_version
            )));
        }
        Self::from_cell(&persisted.data)
    }
}
