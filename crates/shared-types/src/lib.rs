//! # Shared Types Crate
//!
//! This crate contains the wire model every participant of the trust registry
//! protocol agrees on: addresses, cells, message envelopes and the bit-exact
//! body layouts.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Opcodes and body layouts are defined once,
//!   here, and shared by the registry, the authority and the child units.
//! - **Bit-Exact Layouts**: Every body is a [`Cell`] written field by field
//!   with explicit widths. Nothing is serialized through a generic format.
//! - **Opaque Payloads**: Domain payloads travel as cell references and are
//!   never inspected by the router.

pub mod cell;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;

pub use cell::{Cell, CellBuilder, CellSlice, MAX_CELL_BITS, MAX_CELL_REFS};
pub use entities::*;
pub use envelope::{InboundMessage, OutboundMessage, StateInit};
pub use errors::*;
pub use ipc::*;
