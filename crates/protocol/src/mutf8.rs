//! Modified UTF-8, as used for tag names and tag strings
//!
//! Differences from standard UTF-8:
//! - U+0000 is written as the two bytes `C0 80`
//! - Characters above U+FFFF are written as a UTF-16 surrogate pair, each
//!   surrogate encoded on its own as a 3-byte sequence (6 bytes total)
//! - 4-byte sequences never appear

use mcping_core::{Result, StatusError};

/// Encoded length of `s` in bytes
pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

#[inline]
fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// Encode a string
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => out.push(unit as u8),
            2 => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode a byte sequence
///
/// Malformed sequences and unpaired surrogates are format errors.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let unit = if b & 0x80 == 0 {
            i += 1;
            b as u16
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            i += 2;
            ((b as u16 & 0x1F) << 6) | b2
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            i += 3;
            ((b as u16 & 0x0F) << 12) | (b2 << 6) | b3
        } else {
            return Err(StatusError::format(format!(
                "Invalid modified UTF-8 lead byte 0x{:02X} at {}",
                b, i
            )));
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| StatusError::format("Unpaired surrogate in modified UTF-8"))
}

fn continuation(bytes: &[u8], at: usize) -> Result<u16> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
        Some(&b) => Err(StatusError::format(format!(
            "Invalid modified UTF-8 continuation byte 0x{:02X} at {}",
            b, at
        ))),
        None => Err(StatusError::format("Truncated modified UTF-8 sequence")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_unchanged() {
        assert_eq!(encode("hello"), b"hello");
        assert_eq!(decode(b"hello").unwrap(), "hello");
    }

    #[test]
    fn test_nul_uses_two_bytes() {
        assert_eq!(encode("a\0b"), vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&[b'a', 0xC0, 0x80, b'b']).unwrap(), "a\0b");
        assert_eq!(encoded_len("a\0b"), 4);
    }

    #[test]
    fn test_bmp_matches_utf8() {
        let s = "§é€";
        assert_eq!(encode(s), s.as_bytes());
        assert_eq!(decode(s.as_bytes()).unwrap(), s);
    }

    #[test]
    fn test_supplementary_uses_surrogate_pair() {
        // U+1F600 -> D83D DE00
        let encoded = encode("😀");
        assert_eq!(encoded, vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]);
        assert_eq!(encoded_len("😀"), 6);
        assert_eq!(decode(&encoded).unwrap(), "😀");
    }

    #[test]
    fn test_rejects_standard_four_byte_form() {
        assert!(decode("😀".as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_lone_surrogate_and_truncation() {
        assert!(decode(&[0xED, 0xA0, 0xBD]).is_err());
        assert!(decode(&[0xE2, 0x82]).is_err());
        assert!(decode(&[0xC3, 0x41]).is_err());
    }
}
