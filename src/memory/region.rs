//! Flat stack memory
//!
//! [`Memory`] is a fixed-capacity byte array addressed from `0` to `capacity - 1`.
//! There is no write protection: any in-bounds write succeeds, which is exactly what
//! lets an oversized buffer write run over neighbouring frame data.
//!
//! # Growth Direction
//!
//! The direction is fixed at construction and decides where pushes land:
//! - [`GrowthDirection::TowardLow`]: the stack starts at `capacity` and each push moves
//!   the stack pointer down (x86 style)
//! - [`GrowthDirection::TowardHigh`]: the stack starts at `0` and each push moves the
//!   stack pointer up

use super::{decode_word, encode_word, Address};
use crate::simulator::errors::SimError;
use serde::Deserialize;
use std::ops::Range;

/// Direction in which pushes move the stack pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthDirection {
    #[default]
    TowardLow,
    TowardHigh,
}

/// Byte order used to store words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Byte-addressable stack memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Vec<u8>,
    growth: GrowthDirection,
    byte_order: ByteOrder,
}

impl Memory {
    /// Create zero-filled memory of `capacity` bytes
    pub fn new(
        capacity: usize,
        growth: GrowthDirection,
        byte_order: ByteOrder,
    ) -> Result<Self, SimError> {
        if capacity == 0 {
            return Err(SimError::invalid("stack capacity must be positive"));
        }
        Ok(Memory {
            bytes: vec![0; capacity],
            growth,
            byte_order,
        })
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn growth_direction(&self) -> GrowthDirection {
        self.growth
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Stack pointer value of an empty stack
    pub fn initial_stack_pointer(&self) -> Address {
        match self.growth {
            GrowthDirection::TowardLow => self.bytes.len() as Address,
            GrowthDirection::TowardHigh => 0,
        }
    }

    /// Raw view of the whole memory (for snapshots and rendering)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Validate that `[address, address + length)` lies inside the memory
    pub fn check_range(&self, address: Address, length: usize) -> Result<Range<usize>, SimError> {
        let out_of_bounds = || SimError::OutOfBounds {
            address,
            length,
            capacity: self.bytes.len(),
        };
        let start = usize::try_from(address).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(length).ok_or_else(out_of_bounds)?;
        if end > self.bytes.len() {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }

    /// Read `length` bytes starting at `address`
    pub fn read(&self, address: Address, length: usize) -> Result<&[u8], SimError> {
        let range = self.check_range(address, length)?;
        Ok(&self.bytes[range])
    }

    /// Write `data` starting at `address`, overwriting whatever is there
    pub fn write(&mut self, address: Address, data: &[u8]) -> Result<(), SimError> {
        let range = self.check_range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Read a `word`-byte integer in the memory's byte order
    pub fn read_word(&self, address: Address, word: usize) -> Result<u64, SimError> {
        let bytes = self.read(address, word)?;
        Ok(decode_word(bytes, self.byte_order))
    }

    /// Write a `word`-byte integer in the memory's byte order
    pub fn write_word(&mut self, address: Address, value: u64, word: usize) -> Result<(), SimError> {
        let bytes = encode_word(value, word, self.byte_order);
        self.write(address, &bytes)
    }

    /// Compute the region a push of `length` bytes occupies.
    ///
    /// Returns `(new_stack_pointer, region_start)`. Nothing is written; pushes that would
    /// leave the memory fail with [`SimError::OutOfBounds`].
    pub fn push_region(&self, sp: Address, length: usize) -> Result<(Address, Address), SimError> {
        let len = length as Address;
        match self.growth {
            GrowthDirection::TowardLow => {
                let start = sp.checked_sub(len).ok_or(SimError::OutOfBounds {
                    address: sp,
                    length,
                    capacity: self.bytes.len(),
                })?;
                self.check_range(start, length)?;
                Ok((start, start))
            }
            GrowthDirection::TowardHigh => {
                self.check_range(sp, length)?;
                Ok((sp + len, sp))
            }
        }
    }

    /// Place `length` bytes at `offset` inside a pushed region, measured from the end
    /// nearest the stack pointer after the push.
    pub fn place_in_region(
        &self,
        region_start: Address,
        region_len: usize,
        offset: usize,
        length: usize,
    ) -> Address {
        match self.growth {
            GrowthDirection::TowardLow => region_start + offset as Address,
            GrowthDirection::TowardHigh => {
                region_start + (region_len - offset - length) as Address
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(growth: GrowthDirection) -> Memory {
        Memory::new(64, growth, ByteOrder::Little).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Memory::new(0, GrowthDirection::TowardLow, ByteOrder::Little).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_read_write_bounds() {
        let mut mem = memory(GrowthDirection::TowardLow);
        mem.write(60, &[1, 2, 3, 4]).unwrap();
        assert_eq!(mem.read(60, 4).unwrap(), &[1, 2, 3, 4]);

        assert!(matches!(
            mem.write(61, &[0; 4]),
            Err(SimError::OutOfBounds { address: 61, length: 4, capacity: 64 })
        ));
        assert!(matches!(mem.read(64, 1), Err(SimError::OutOfBounds { .. })));
        // Failed writes leave memory untouched
        assert_eq!(mem.read(60, 4).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_overwrite_is_unconditional() {
        let mut mem = memory(GrowthDirection::TowardLow);
        mem.write_word(8, 0xdead_beef, 4).unwrap();
        mem.write(9, &[0x41, 0x41]).unwrap();
        assert_eq!(mem.read_word(8, 4).unwrap(), 0xde41_41ef);
    }

    #[test]
    fn test_push_region_toward_low() {
        let mem = memory(GrowthDirection::TowardLow);
        let sp = mem.initial_stack_pointer();
        assert_eq!(sp, 64);
        assert_eq!(mem.push_region(sp, 8).unwrap(), (56, 56));
        assert!(matches!(mem.push_region(4, 8), Err(SimError::OutOfBounds { .. })));
    }

    #[test]
    fn test_push_region_toward_high() {
        let mem = memory(GrowthDirection::TowardHigh);
        let sp = mem.initial_stack_pointer();
        assert_eq!(sp, 0);
        assert_eq!(mem.push_region(sp, 8).unwrap(), (8, 0));
        assert!(matches!(mem.push_region(60, 8), Err(SimError::OutOfBounds { .. })));
    }

    #[test]
    fn test_place_in_region_mirrors() {
        let low = memory(GrowthDirection::TowardLow);
        let high = memory(GrowthDirection::TowardHigh);
        assert_eq!(low.place_in_region(40, 20, 8, 12), 48);
        assert_eq!(high.place_in_region(40, 20, 8, 12), 40);
        assert_eq!(high.place_in_region(40, 20, 0, 8), 52);
    }
}
