//! # Error Types
//!
//! Defines error types used by the wire model.

use thiserror::Error;

/// Errors raised while building or reading a [`crate::Cell`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// Not enough data bits left in the builder.
    #[error("Cell overflow: {requested} bits requested, {available} available")]
    CellOverflow { requested: usize, available: usize },

    /// The builder already holds the maximum number of references.
    #[error("Reference overflow: a cell holds at most {max} references")]
    RefOverflow { max: usize },

    /// Not enough data bits left in the slice.
    #[error("Cell underflow: {requested} bits requested, {available} available")]
    CellUnderflow { requested: usize, available: usize },

    /// No reference left in the slice.
    #[error("Reference underflow")]
    RefUnderflow,

    /// A value does not fit the requested field width.
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: String, bits: usize },

    /// Field width not supported by the accessor.
    #[error("Unsupported field width: {0} bits")]
    UnsupportedWidth(usize),

    /// Address prefix other than the standard internal address tag.
    #[error("Unsupported address tag: {0:#04b}")]
    InvalidAddressTag(u8),
}

/// Errors raised while parsing a textual address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Missing `workchain:hash` separator.
    #[error("Address must be formatted as <workchain>:<hex hash>")]
    MissingSeparator,

    /// Workchain part is not a signed 8-bit integer.
    #[error("Invalid workchain: {0}")]
    InvalidWorkchain(String),

    /// Hash part is not 64 hex characters.
    #[error("Invalid account hash: {0}")]
    InvalidHash(String),
}
