//! # Domain Errors
//!
//! Error types for the trust registry.
//!
//! Every protocol rejection aborts the whole transaction: no state is
//! written and no outbound message is released.

use shared_types::{Address, CellError};
use thiserror::Error;

/// Registry protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Claimed index has not been allocated yet.
    #[error("Index out of range: {index} >= next index {next_index}")]
    IndexOutOfRange {
        /// Index named by the message
        index: u64,
        /// Current allocation counter
        next_index: u64,
    },

    /// Observed sender is not the identity the operation requires.
    #[error("Sender mismatch: expected {expected}, observed {observed}")]
    SenderMismatch {
        /// Derived child address or authority address
        expected: Address,
        /// Sender reported by the substrate
        observed: Address,
    },

    /// Opcode outside the recognized set.
    #[error("Unrecognized operation: {0:#010x}")]
    UnrecognizedOperation(u32),

    /// Body does not match the layout its opcode requires.
    #[error("Malformed message: {0}")]
    MalformedMessage(#[from] CellError),

    /// Every index the wire can carry has been handed out.
    #[error("Capacity exhausted at next index {next_index}")]
    CapacityExhausted {
        /// Current allocation counter
        next_index: u64,
    },

    /// Persisted record cannot be decoded.
    #[error("Corrupt registry state: {0}")]
    CorruptState(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// State store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Outbound transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The transport failed after a commit and the previous record could
    /// not be restored. The stored record reflects messages that were never sent.
    #[error("State diverged: transport failed ({transport}), restore failed ({store})")]
    StateDiverged {
        /// Why the batch was not sent
        transport: TransportError,
        /// Why the previous record was not restored
        store: StoreError,
    },
}

impl RegistryError {
    /// Ledger-style exit code reported to off-chain collaborators.
    #[must_use]
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::MalformedMessage(_) => 9,
            Self::SenderMismatch { .. } => 401,
            Self::IndexOutOfRange { .. } => 402,
            Self::CapacityExhausted { .. } => 403,
            Self::CorruptState(_) => 500,
            Self::Config(_)
            | Self::Store(_)
            | Self::Transport(_)
            | Self::StateDiverged { .. } => 501,
            Self::UnrecognizedOperation(_) => 0xFFFF,
        }
    }

    /// True for failures of the store or transport rather than of the
    /// message itself.
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Transport(_) | Self::StateDiverged { .. }
        )
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A `RetainFee` policy with a zero fee.
    #[error("Invalid value policy for {direction}: {reason}")]
    InvalidValuePolicy {
        /// Which route the policy applies to
        direction: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Value could not be parsed.
    #[error("Invalid config value for {key}: {value}")]
    InvalidValue {
        /// Config key or env variable
        key: String,
        /// Raw value
        value: String,
    },

    /// JSON document could not be parsed.
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// State store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing has been persisted yet.
    #[error("Registry state not initialized")]
    NotInitialized,

    /// A record already exists; deployment happens once.
    #[error("Registry state already initialized")]
    AlreadyInitialized,

    /// Backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Outbound transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Attached state init does not hash to the destination.
    #[error("State init does not match destination {0}")]
    StateInitMismatch(Address),

    /// Transport is no longer accepting messages.
    #[error("Transport closed")]
    Closed,
}
