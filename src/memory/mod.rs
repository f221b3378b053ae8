//! Memory model for the stack simulator
//!
//! This module provides the core memory abstractions:
//! - [`region`]: Flat byte-addressable stack memory with a fixed growth direction
//! - [`stack`]: Stack frames and the call stack that owns them
//!
//! # Word Sizes
//!
//! Every slot that holds control data (saved frame pointer, return address) is exactly
//! one word wide. Locals and stack-passed parameters are rounded up to whole words:
//! ```text
//! aligned(size) = ceil(size / word) * word
//! ```
//!
//! Words are encoded in the memory's declared [`ByteOrder`] by [`encode_word`] and
//! decoded by [`decode_word`].

pub mod region;
pub mod stack;

pub use region::{ByteOrder, GrowthDirection, Memory};

/// Memory address type (64-bit)
pub type Address = u64;

/// Round `size` up to the next multiple of `word`
pub fn align_up(size: usize, word: usize) -> usize {
    size.div_ceil(word) * word
}

/// Encode the low `word` bytes of `value`
pub fn encode_word(value: u64, word: usize, order: ByteOrder) -> Vec<u8> {
    match order {
        ByteOrder::Little => value.to_le_bytes()[..word].to_vec(),
        ByteOrder::Big => value.to_be_bytes()[8 - word..].to_vec(),
    }
}

/// Decode up to 8 bytes into an integer
pub fn decode_word(bytes: &[u8], order: ByteOrder) -> u64 {
    match order {
        ByteOrder::Little => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64),
        ByteOrder::Big => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(5, 4), 8);
        assert_eq!(align_up(10, 4), 12);
        assert_eq!(align_up(8, 4), 8);
        assert_eq!(align_up(5, 8), 8);
        assert_eq!(align_up(9, 8), 16);
    }

    #[test]
    fn test_word_encoding() {
        assert_eq!(
            encode_word(0x0804_8410, 4, ByteOrder::Little),
            vec![0x10, 0x84, 0x04, 0x08]
        );
        assert_eq!(
            encode_word(0x0804_8410, 4, ByteOrder::Big),
            vec![0x08, 0x04, 0x84, 0x10]
        );
        assert_eq!(decode_word(&[0x10, 0x84, 0x04, 0x08], ByteOrder::Little), 0x0804_8410);
        assert_eq!(decode_word(&[0x08, 0x04, 0x84, 0x10], ByteOrder::Big), 0x0804_8410);
        assert_eq!(
            decode_word(&encode_word(u64::MAX, 8, ByteOrder::Little), ByteOrder::Little),
            u64::MAX
        );
    }
}
