//! # Message Bodies
//!
//! Opcodes and the bit-exact body layouts exchanged between the authority,
//! the registry and the child units.
//!
//! | Body | Layout |
//! |------|--------|
//! | convey request | `op:32 correlation:64 index:50 method:32 ^payload` |
//! | allocate request | `op:32 correlation:64 ^init_payload` |
//! | report to authority | `method:32 correlation:64 index:50 ^payload` |
//! | command to child | `method:32 correlation:64 ^payload` |
//! | excesses notice | `op:32 correlation:64` |

use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::errors::CellError;
use std::sync::Arc;

/// Width of the opcode field.
pub const OPCODE_BITS: usize = 32;

/// Width of the correlation identifier.
pub const CORRELATION_BITS: usize = 64;

/// Width of the child index. Changing it is a protocol version change.
pub const INDEX_BITS: usize = 50;

/// Width of the opaque method selector.
pub const METHOD_BITS: usize = 32;

/// Largest index the wire can carry.
pub const MAX_WIRE_INDEX: u64 = (1 << INDEX_BITS) - 1;

/// Prefix the substrate puts in front of a returned body.
pub const BOUNCE_PREFIX: u32 = 0xFFFF_FFFF;

/// Opcode constants.
pub mod op {
    /// Allocate the next child index and deploy the unit.
    pub const ALLOCATE: u32 = 0x1674_b0a0;
    /// Child unit to authority.
    pub const CONVEY_UP: u32 = 0x2b1f_7c6e;
    /// Authority to child unit.
    pub const CONVEY_DOWN: u32 = 0x5e6a_0d19;
    /// Residual value / delivery failure notice.
    pub const EXCESSES: u32 = 0xd532_76db;
}

/// Leading `op` and `correlation_id` fields shared by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Operation selector.
    pub opcode: u32,
    /// Request/response pairing value.
    pub correlation_id: u64,
}

impl MessageHeader {
    /// Reads the header from the front of a body.
    pub fn load(slice: &mut CellSlice<'_>) -> Result<Self, CellError> {
        let opcode = slice.load_uint(OPCODE_BITS)? as u32;
        let correlation_id = slice.load_uint(CORRELATION_BITS)?;
        Ok(Self {
            opcode,
            correlation_id,
        })
    }
}

/// Convey request in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConveyRequest {
    /// Echoed unchanged across the hop.
    pub correlation_id: u64,
    /// Child unit ordinal.
    pub index: u64,
    /// Opaque sub-operation.
    pub method: u32,
    /// Opaque data.
    pub payload: Arc<Cell>,
}

impl ConveyRequest {
    /// Encodes the request under `opcode` (`op::CONVEY_UP` or `op::CONVEY_DOWN`).
    pub fn to_cell(&self, opcode: u32) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(opcode), OPCODE_BITS)?
            .store_uint(self.correlation_id, CORRELATION_BITS)?
            .store_uint(self.index, INDEX_BITS)?
            .store_uint(u64::from(self.method), METHOD_BITS)?
            .store_ref(Arc::clone(&self.payload))?;
        Ok(b.build())
    }

    /// Reads the fields following an already consumed header.
    pub fn load_tail(header: MessageHeader, slice: &mut CellSlice<'_>) -> Result<Self, CellError> {
        let index = slice.load_uint(INDEX_BITS)?;
        let method = slice.load_uint(METHOD_BITS)? as u32;
        let payload = slice.load_ref()?;
        Ok(Self {
            correlation_id: header.correlation_id,
            index,
            method,
            payload,
        })
    }
}

/// Allocation request; also the body of the deployment message a new child
/// unit receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocateRequest {
    /// Echoed unchanged to the new unit.
    pub correlation_id: u64,
    /// Opaque initialization data for the new unit.
    pub init_payload: Arc<Cell>,
}

impl AllocateRequest {
    /// Encodes under `op::ALLOCATE`.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(op::ALLOCATE), OPCODE_BITS)?
            .store_uint(self.correlation_id, CORRELATION_BITS)?
            .store_ref(Arc::clone(&self.init_payload))?;
        Ok(b.build())
    }

    /// Reads the fields following an already consumed header.
    pub fn load_tail(header: MessageHeader, slice: &mut CellSlice<'_>) -> Result<Self, CellError> {
        Ok(Self {
            correlation_id: header.correlation_id,
            init_payload: slice.load_ref()?,
        })
    }
}

/// Upward convey as delivered to the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityReport {
    /// Method selected by the child unit.
    pub method: u32,
    /// Correlation from the child's request.
    pub correlation_id: u64,
    /// Authenticated index of the reporting unit.
    pub index: u64,
    /// Opaque data.
    pub payload: Arc<Cell>,
}

impl AuthorityReport {
    /// Encodes the report.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(self.method), METHOD_BITS)?
            .store_uint(self.correlation_id, CORRELATION_BITS)?
            .store_uint(self.index, INDEX_BITS)?
            .store_ref(Arc::clone(&self.payload))?;
        Ok(b.build())
    }

    /// Decodes a report body.
    pub fn parse(cell: &Cell) -> Result<Self, CellError> {
        let mut s = cell.slice();
        Ok(Self {
            method: s.load_uint(METHOD_BITS)? as u32,
            correlation_id: s.load_uint(CORRELATION_BITS)?,
            index: s.load_uint(INDEX_BITS)?,
            payload: s.load_ref()?,
        })
    }
}

/// Downward convey as delivered to a child unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildCommand {
    /// Method selected by the authority.
    pub method: u32,
    /// Correlation from the authority's request.
    pub correlation_id: u64,
    /// Opaque data.
    pub payload: Arc<Cell>,
}

impl ChildCommand {
    /// Encodes the command.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(self.method), METHOD_BITS)?
            .store_uint(self.correlation_id, CORRELATION_BITS)?
            .store_ref(Arc::clone(&self.payload))?;
        Ok(b.build())
    }

    /// Decodes a command body.
    pub fn parse(cell: &Cell) -> Result<Self, CellError> {
        let mut s = cell.slice();
        Ok(Self {
            method: s.load_uint(METHOD_BITS)? as u32,
            correlation_id: s.load_uint(CORRELATION_BITS)?,
            payload: s.load_ref()?,
        })
    }
}

/// Failure/residual-value notice. Carries no index and no method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcessesNotice {
    /// Always the zero sentinel when produced from a bounce.
    pub correlation_id: u64,
}

impl ExcessesNotice {
    /// Encodes under `op::EXCESSES`.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_uint(u64::from(op::EXCESSES), OPCODE_BITS)?
            .store_uint(self.correlation_id, CORRELATION_BITS)?;
        Ok(b.build())
    }

    /// Decodes a notice body; `None` if the opcode is not `op::EXCESSES`.
    pub fn parse(cell: &Cell) -> Result<Option<Self>, CellError> {
        let header = MessageHeader::load(&mut cell.slice())?;
        if header.opcode != op::EXCESSES {
            return Ok(None);
        }
        Ok(Some(Self {
            correlation_id: header.correlation_id,
        }))
    }
}
