//! # Cells
//!
//! The unit of data on the wire: up to 1023 bits plus up to four references
//! to other cells. Message bodies, payloads, code templates and the persisted
//! registry record are all cells.
//!
//! Bits are packed MSB-first. Integers are big-endian.

use crate::entities::{Address, Coins, Hash, MAX_COINS};
use crate::errors::CellError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Maximum number of data bits in one cell.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references in one cell.
pub const MAX_CELL_REFS: usize = 4;

/// `addr_std$10 anycast:0` prefix of a standard internal address.
const ADDR_STD_PREFIX: u64 = 0b100;

/// Width of a serialized standard address.
pub const ADDRESS_BITS: usize = 3 + 8 + 256;

/// Width of the byte-length prefix of a serialized [`Coins`] amount.
const COINS_LEN_BITS: usize = 4;

/// Immutable cell.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// The empty cell (no bits, no references).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of data bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Packed data bytes; trailing bits of the last byte are zero.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child references.
    #[must_use]
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// True when the cell carries neither bits nor references.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    /// Opens a reader positioned at the first bit and first reference.
    #[must_use]
    pub fn slice(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Representation hash.
    ///
    /// SHA-256 over a two-byte descriptor (reference count, data length
    /// class), the data bytes with a completion tag after the last bit when
    /// the length is not byte aligned, and the hashes of every reference.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let full_bytes = self.bit_len / 8;
        let rem = self.bit_len % 8;

        let d1 = self.refs.len() as u8;
        let d2 = (full_bytes * 2 + usize::from(rem != 0)) as u8;

        let mut hasher = Sha256::new();
        hasher.update([d1, d2]);
        hasher.update(&self.data[..full_bytes]);
        if rem != 0 {
            hasher.update([self.data[full_bytes] | (0x80 >> rem)]);
        }
        for r in &self.refs {
            hasher.update(r.hash());
        }
        hasher.finalize().into()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("data", &hex::encode(&self.data))
            .field("refs", &self.refs)
            .finish()
    }
}

/// Append-only cell writer.
#[derive(Debug, Default, Clone)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining data capacity in bits.
    #[must_use]
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    fn ensure_capacity(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.bits_left() {
            return Err(CellError::CellOverflow {
                requested: bits,
                available: self.bits_left(),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Stores a single bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.ensure_capacity(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Stores an unsigned integer of `bits` width (at most 64).
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 {
            return Err(CellError::UnsupportedWidth(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        self.ensure_capacity(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Stores a two's-complement signed integer of `bits` width (1..=64).
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, CellError> {
        if bits == 0 || bits > 64 {
            return Err(CellError::UnsupportedWidth(bits));
        }
        let min = -(1i128 << (bits - 1));
        let max = (1i128 << (bits - 1)) - 1;
        if i128::from(value) < min || i128::from(value) > max {
            return Err(CellError::ValueOutOfRange {
                value: value.to_string(),
                bits,
            });
        }
        let mask = if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        };
        self.store_uint(value as u64 & mask, bits)
    }

    /// Stores raw bytes.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_capacity(bytes.len() * 8)?;
        for byte in bytes {
            self.store_uint(u64::from(*byte), 8)?;
        }
        Ok(self)
    }

    /// Stores a standard internal address.
    pub fn store_address(&mut self, address: &Address) -> Result<&mut Self, CellError> {
        self.ensure_capacity(ADDRESS_BITS)?;
        self.store_uint(ADDR_STD_PREFIX, 3)?;
        self.store_int(i64::from(address.workchain), 8)?;
        self.store_bytes(&address.hash)
    }

    /// Stores a value amount: a 4-bit byte length, then the minimal
    /// big-endian bytes. Zero is the bare length `0`.
    pub fn store_coins(&mut self, amount: Coins) -> Result<&mut Self, CellError> {
        if amount > MAX_COINS {
            return Err(CellError::ValueOutOfRange {
                value: amount.to_string(),
                bits: 120,
            });
        }
        let bytes = amount.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let significant = &bytes[skip..];
        self.ensure_capacity(COINS_LEN_BITS + significant.len() * 8)?;
        self.store_uint(significant.len() as u64, COINS_LEN_BITS)?;
        self.store_bytes(significant)
    }

    /// Appends a reference to another cell.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(CellError::RefOverflow { max: MAX_CELL_REFS });
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Finalizes the cell.
    #[must_use]
    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}

/// Sequential reader over a [`Cell`].
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl CellSlice<'_> {
    /// Unread data bits.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    /// Unread references.
    #[must_use]
    pub fn remaining_refs(&self) -> usize {
        self.cell.refs.len() - self.ref_pos
    }

    /// True once every bit and reference has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0 && self.remaining_refs() == 0
    }

    fn ensure(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.remaining_bits() {
            return Err(CellError::CellUnderflow {
                requested: bits,
                available: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn bit_at(&self, pos: usize) -> bool {
        (self.cell.data[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }

    /// Reads one bit.
    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure(1)?;
        let bit = self.bit_at(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Reads an unsigned integer of `bits` width without advancing.
    pub fn preload_uint(&self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::UnsupportedWidth(bits));
        }
        self.ensure(bits)?;
        Ok((self.bit_pos..self.bit_pos + bits)
            .fold(0u64, |acc, pos| (acc << 1) | u64::from(self.bit_at(pos))))
    }

    /// Reads an unsigned integer of `bits` width (at most 64).
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        let value = self.preload_uint(bits)?;
        self.bit_pos += bits;
        Ok(value)
    }

    /// Reads a two's-complement signed integer of `bits` width (1..=64).
    pub fn load_int(&mut self, bits: usize) -> Result<i64, CellError> {
        if bits == 0 || bits > 64 {
            return Err(CellError::UnsupportedWidth(bits));
        }
        let raw = self.load_uint(bits)?;
        if bits < 64 && raw & (1u64 << (bits - 1)) != 0 {
            Ok((raw | (u64::MAX << bits)) as i64)
        } else {
            Ok(raw as i64)
        }
    }

    /// Reads `len` raw bytes.
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure(len * 8)?;
        (0..len).map(|_| self.load_uint(8).map(|b| b as u8)).collect()
    }

    /// Reads a value amount written by [`CellBuilder::store_coins`].
    pub fn load_coins(&mut self) -> Result<Coins, CellError> {
        let len = self.preload_uint(COINS_LEN_BITS)? as usize;
        self.ensure(COINS_LEN_BITS + len * 8)?;
        self.bit_pos += COINS_LEN_BITS;
        Ok(self
            .load_bytes(len)?
            .into_iter()
            .fold(0, |acc, b| (acc << 8) | Coins::from(b)))
    }

    /// Reads a standard internal address.
    pub fn load_address(&mut self) -> Result<Address, CellError> {
        self.ensure(ADDRESS_BITS)?;
        let prefix = self.load_uint(3)?;
        if prefix != ADDR_STD_PREFIX {
            return Err(CellError::InvalidAddressTag(prefix as u8));
        }
        let workchain = self.load_int(8)? as i8;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&self.load_bytes(32)?);
        Ok(Address { workchain, hash })
    }

    /// Reads the next reference.
    pub fn load_ref(&mut self) -> Result<Arc<Cell>, CellError> {
        let cell = self
            .cell
            .refs
            .get(self.ref_pos)
            .cloned()
            .ok_or(CellError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_with(value: u64, bits: usize) -> Cell {
        let mut b = CellBuilder::new();
        b.store_uint(value, bits).unwrap();
        b.build()
    }

    #[test]
    fn test_empty_cell() {
        let cell = Cell::empty();
        assert!(cell.is_empty());
        assert!(cell.slice().is_exhausted());
    }

    #[test]
    fn test_bits_are_packed_msb_first() {
        let cell = cell_with(0b101, 3);
        assert_eq!(cell.bit_len(), 3);
        assert_eq!(cell.data(), &[0b1010_0000]);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(cell_with(42, 32).hash(), cell_with(42, 32).hash());
    }

    #[test]
    fn test_hash_depends_on_width() {
        // Same leading bits, different length.
        assert_ne!(cell_with(0, 8).hash(), cell_with(0, 9).hash());
    }

    #[test]
    fn test_hash_depends_on_refs() {
        let leaf = Arc::new(cell_with(1, 1));
        let mut with_ref = CellBuilder::new();
        with_ref.store_uint(7, 8).unwrap().store_ref(leaf).unwrap();
        assert_ne!(with_ref.build().hash(), cell_with(7, 8).hash());
    }

    #[test]
    fn test_store_uint_rejects_wide_value() {
        let mut b = CellBuilder::new();
        let err = b.store_uint(1 << 50, 50).unwrap_err();
        assert!(matches!(err, CellError::ValueOutOfRange { bits: 50, .. }));
    }

    #[test]
    fn test_store_overflow() {
        let mut b = CellBuilder::new();
        b.store_uint(0, 64).unwrap();
        for _ in 0..14 {
            b.store_uint(u64::MAX, 64).unwrap();
        }
        // 960 bits used, 63 left.
        assert!(matches!(
            b.store_uint(0, 64),
            Err(CellError::CellOverflow { available: 63, .. })
        ));
        assert!(b.store_uint(0, 63).is_ok());
        assert_eq!(b.bits_left(), 0);
    }

    #[test]
    fn test_ref_overflow() {
        let mut b = CellBuilder::new();
        for _ in 0..MAX_CELL_REFS {
            b.store_ref(Arc::new(Cell::empty())).unwrap();
        }
        assert!(matches!(
            b.store_ref(Arc::new(Cell::empty())),
            Err(CellError::RefOverflow { .. })
        ));
    }

    #[test]
    fn test_load_underflow() {
        let cell = cell_with(3, 2);
        let mut s = cell.slice();
        assert!(matches!(
            s.load_uint(32),
            Err(CellError::CellUnderflow {
                requested: 32,
                available: 2
            })
        ));
        assert!(matches!(s.load_ref(), Err(CellError::RefUnderflow)));
    }

    #[test]
    fn test_signed_values() {
        let mut b = CellBuilder::new();
        b.store_int(-1, 8).unwrap().store_int(-300, 16).unwrap();
        let cell = b.build();
        let mut s = cell.slice();
        assert_eq!(s.load_int(8).unwrap(), -1);
        assert_eq!(s.load_int(16).unwrap(), -300);
    }

    #[test]
    fn test_store_int_range() {
        let mut b = CellBuilder::new();
        assert!(b.store_int(128, 8).is_err());
        assert!(b.store_int(-129, 8).is_err());
        assert!(b.store_int(127, 8).is_ok());
    }

    #[test]
    fn test_address_layout() {
        let addr = Address::new(-1, [0x5A; 32]);
        let mut b = CellBuilder::new();
        b.store_address(&addr).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), ADDRESS_BITS);
        assert_eq!(cell.slice().load_address().unwrap(), addr);
    }

    #[test]
    fn test_load_address_rejects_other_tags() {
        let mut b = CellBuilder::new();
        b.store_uint(0, ADDRESS_BITS - 256).unwrap();
        b.store_bytes(&[0u8; 32]).unwrap();
        let cell = b.build();
        assert!(matches!(
            cell.slice().load_address(),
            Err(CellError::InvalidAddressTag(0))
        ));
    }

    #[test]
    fn test_preload_does_not_advance() {
        let cell = cell_with(0xFFFF_FFFF, 32);
        let mut s = cell.slice();
        assert_eq!(s.preload_uint(32).unwrap(), 0xFFFF_FFFF);
        assert_eq!(s.remaining_bits(), 32);
        s.load_uint(32).unwrap();
        assert!(s.is_exhausted());
    }

    #[test]
    fn test_coins_layout() {
        let mut b = CellBuilder::new();
        b.store_coins(0).unwrap();
        assert_eq!(b.build().bit_len(), 4);

        let mut b = CellBuilder::new();
        b.store_coins(0x01_00).unwrap();
        let cell = b.build();
        // len = 2, then 0x01 0x00
        assert_eq!(cell.bit_len(), 4 + 16);
        assert_eq!(cell.slice().load_uint(20).unwrap(), 0x2_0100);
    }

    #[test]
    fn test_coins_boundaries() {
        let mut b = CellBuilder::new();
        for amount in [0, 1, 255, 256, 1_000_000_000, u128::from(u64::MAX) + 1, MAX_COINS] {
            b.store_coins(amount).unwrap();
        }
        let cell = b.build();
        let mut s = cell.slice();
        for amount in [0, 1, 255, 256, 1_000_000_000, u128::from(u64::MAX) + 1, MAX_COINS] {
            assert_eq!(s.load_coins().unwrap(), amount);
        }
        assert!(s.is_exhausted());
    }

    #[test]
    fn test_coins_above_limit_rejected() {
        let mut b = CellBuilder::new();
        let err = b.store_coins(MAX_COINS + 1).unwrap_err();
        assert!(matches!(err, CellError::ValueOutOfRange { bits: 120, .. }));
        assert!(b.store_coins(u128::MAX).is_err());
        assert_eq!(b.bits_left(), MAX_CELL_BITS);
    }

    #[test]
    fn test_truncated_coins_rejected() {
        // Length prefix claims 3 bytes, only 1 follows.
        let cell = cell_with(0x3_FF, 12);
        let mut s = cell.slice();
        assert!(matches!(
            s.load_coins(),
            Err(CellError::CellUnderflow { requested: 28, .. })
        ));
        assert_eq!(s.remaining_bits(), 12);
    }
}
