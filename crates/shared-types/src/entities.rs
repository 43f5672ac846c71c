//! # Core Entities
//!
//! Account identities and value amounts.

use crate::errors::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte SHA-256 representation hash.
pub type Hash = [u8; 32];

/// Amount of native value attached to a message.
///
/// Serialized on the wire as a variable-length unsigned integer of at most
/// 15 bytes, so values must stay below 2^120.
pub type Coins = u128;

/// Largest amount that fits the 15-byte wire encoding.
pub const MAX_COINS: Coins = (1 << 120) - 1;

/// Standard internal account address: a workchain plus the representation
/// hash of the account's initial state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    /// Workchain the account lives on.
    pub workchain: i8,
    /// Representation hash of the account's `StateInit`.
    pub hash: Hash,
}

impl Address {
    /// All-zero sentinel address on the base workchain.
    pub const ZERO: Self = Self {
        workchain: 0,
        hash: [0u8; 32],
    };

    /// Creates an address from its parts.
    #[must_use]
    pub const fn new(workchain: i8, hash: Hash) -> Self {
        Self { workchain, hash }
    }

    /// Returns true for the zero sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Short form used in log lines: workchain and first four hash bytes.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}:{}..", self.workchain, hex::encode(&self.hash[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hash_hex) = s.split_once(':').ok_or(AddressError::MissingSeparator)?;
        let workchain = wc
            .trim()
            .parse::<i8>()
            .map_err(|_| AddressError::InvalidWorkchain(wc.to_string()))?;

        let bytes =
            hex::decode(hash_hex.trim()).map_err(|_| AddressError::InvalidHash(hash_hex.into()))?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidHash(hash_hex.to_string()))?;

        Ok(Self { workchain, hash })
    }
}
