//! Payload description used by `write` steps
//!
//! Pieces are concatenated in a fixed order:
//! ```text
//! text ++ hex ++ fill × count ++ encode_word(return_to)
//! ```

use crate::memory::{encode_word, ByteOrder};
use serde::Deserialize;

/// Bytes to write into a buffer
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Payload {
    /// Literal text, written as UTF-8 without a terminator
    pub text: Option<String>,
    /// Hex digits, whitespace ignored (e.g. `"90 90 cc"`)
    pub hex: Option<String>,
    /// Repeated byte; defaults to `0x41` when only `count` is given
    pub fill: Option<u8>,
    pub count: Option<usize>,
    /// Address appended as one word in the memory's byte order
    pub return_to: Option<u64>,
}

impl Payload {
    /// `count` copies of `byte`
    pub fn filled(byte: u8, count: usize) -> Self {
        Payload {
            fill: Some(byte),
            count: Some(count),
            ..Payload::default()
        }
    }

    pub fn then_return_to(mut self, address: u64) -> Self {
        self.return_to = Some(address);
        self
    }

    /// Assemble the raw bytes
    pub fn to_bytes(&self, word: usize, order: ByteOrder) -> Result<Vec<u8>, String> {
        let mut bytes = Vec::new();

        if let Some(text) = &self.text {
            bytes.extend_from_slice(text.as_bytes());
        }
        if let Some(hex) = &self.hex {
            bytes.extend(decode_hex(hex)?);
        }
        match (self.fill, self.count) {
            (fill, Some(count)) => bytes.resize(bytes.len() + count, fill.unwrap_or(b'A')),
            (Some(_), None) => return Err("'fill' needs a 'count'".to_string()),
            (None, None) => {}
        }
        if let Some(address) = self.return_to {
            if word < 8 && address >> (word * 8) != 0 {
                return Err(format!(
                    "return_to 0x{:x} does not fit in a {}-byte word",
                    address, word
                ));
            }
            bytes.extend(encode_word(address, word, order));
        }

        Ok(bytes)
    }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in \"{}\"", hex));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s: String = pair.iter().collect();
            u8::from_str_radix(&s, 16).map_err(|_| format!("invalid hex byte \"{}\"", s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pieces_concatenate_in_order() {
        let payload = Payload {
            text: Some("AB".to_string()),
            hex: Some("90 cc".to_string()),
            fill: Some(0x00),
            count: Some(2),
            return_to: Some(0x0804_9000),
        };
        assert_eq!(
            payload.to_bytes(4, ByteOrder::Little).unwrap(),
            vec![b'A', b'B', 0x90, 0xcc, 0, 0, 0x00, 0x90, 0x04, 0x08]
        );
    }

    #[test]
    fn test_count_defaults_to_a() {
        let payload = Payload {
            count: Some(3),
            ..Payload::default()
        };
        assert_eq!(payload.to_bytes(4, ByteOrder::Little).unwrap(), b"AAA".to_vec());
    }

    #[test]
    fn test_invalid_payloads() {
        let bad_hex = Payload {
            hex: Some("abc".to_string()),
            ..Payload::default()
        };
        assert!(bad_hex.to_bytes(4, ByteOrder::Little).is_err());

        let no_count = Payload {
            fill: Some(1),
            ..Payload::default()
        };
        assert!(no_count.to_bytes(4, ByteOrder::Little).is_err());

        let too_wide = Payload::default().then_return_to(0x1_0000_0000);
        assert!(too_wide.to_bytes(4, ByteOrder::Little).is_err());
        assert!(too_wide.to_bytes(8, ByteOrder::Little).is_ok());
    }

    #[test]
    fn test_big_endian_return_to() {
        let payload = Payload::filled(0x41, 1).then_return_to(0xdead_beef);
        assert_eq!(
            payload.to_bytes(4, ByteOrder::Big).unwrap(),
            vec![0x41, 0xde, 0xad, 0xbe, 0xef]
        );
    }
}
