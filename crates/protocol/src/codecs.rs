//! VarInt/VarLong and packet-string codecs
//!
//! Integers are written 7 bits at a time, least significant group first. Every
//! byte except the last has its high bit set. Negative numbers are written
//! through their two's-complement bit pattern, so `-1` always takes the
//! maximum length (5 bytes for VarInt, 10 for VarLong).

use bytes::{Buf, BufMut};
use mcping_core::{Result, StatusError};

/// Longest valid VarInt encoding
pub const MAX_VARINT_LEN: usize = 5;

/// Longest valid VarLong encoding
pub const MAX_VARLONG_LEN: usize = 10;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Write a VarInt
///
/// # Format
/// - 1-5 bytes
/// - Low 7 bits of each byte carry data, low group first
/// - Bit 7 set on all bytes but the last
#[inline]
pub fn write_varint(buf: &mut impl BufMut, val: i32) {
    let mut value = val as u32;
    loop {
        if value & !(SEGMENT_BITS as u32) == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

/// Write a VarLong (1-10 bytes, same layout as VarInt)
#[inline]
pub fn write_varlong(buf: &mut impl BufMut, val: i64) {
    let mut value = val as u64;
    loop {
        if value & !(SEGMENT_BITS as u64) == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

/// Read a VarInt
///
/// Fails if the input ends early or if a sixth group would be needed.
#[inline]
pub fn read_varint(buf: &mut impl Buf) -> Result<i32> {
    let mut result: u32 = 0;
    for group in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(StatusError::format("Not enough bytes for VarInt"));
        }
        let byte = buf.get_u8();
        result |= ((byte & SEGMENT_BITS) as u32) << (7 * group);
        if byte & CONTINUE_BIT == 0 {
            return Ok(result as i32);
        }
    }
    Err(StatusError::format("VarInt is longer than 5 bytes"))
}

/// Read a VarLong
#[inline]
pub fn read_varlong(buf: &mut impl Buf) -> Result<i64> {
    let mut result: u64 = 0;
    for group in 0..MAX_VARLONG_LEN {
        if !buf.has_remaining() {
            return Err(StatusError::format("Not enough bytes for VarLong"));
        }
        let byte = buf.get_u8();
        result |= ((byte & SEGMENT_BITS) as u64) << (7 * group);
        if byte & CONTINUE_BIT == 0 {
            return Ok(result as i64);
        }
    }
    Err(StatusError::format("VarLong is longer than 10 bytes"))
}

/// Try to read a VarInt from the front of `src` without consuming it
///
/// Returns `Ok(None)` when `src` ends before the number does, and
/// `Ok(Some((value, bytes_used)))` otherwise. Used by the frame decoder,
/// which may only hold part of a packet header.
pub fn peek_varint(src: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut result: u32 = 0;
    for group in 0..MAX_VARINT_LEN {
        let Some(&byte) = src.get(group) else {
            return Ok(None);
        };
        result |= ((byte & SEGMENT_BITS) as u32) << (7 * group);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((result as i32, group + 1)));
        }
    }
    Err(StatusError::format("VarInt is longer than 5 bytes"))
}

/// Number of bytes `write_varint` emits for `val`
#[inline]
pub fn varint_len(val: i32) -> usize {
    let value = val as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Number of bytes `write_varlong` emits for `val`
#[inline]
pub fn varlong_len(val: i64) -> usize {
    let bits = 64 - (val as u64).leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Write a packet string
///
/// # Format
/// - VarInt: UTF-8 byte length
/// - UTF-8 bytes
///
/// Not to be confused with tag strings, which use a 2-byte length and
/// modified UTF-8.
#[inline]
pub fn write_string(buf: &mut impl BufMut, val: &str) {
    write_varint(buf, val.len() as i32);
    buf.put_slice(val.as_bytes());
}

/// Read a packet string
#[inline]
pub fn read_string(buf: &mut impl Buf) -> Result<String> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Err(StatusError::format(format!("Negative string length: {}", len)));
    }
    let len = len as usize;

    if buf.remaining() < len {
        return Err(StatusError::format(format!(
            "String length {} exceeds remaining {} bytes",
            len,
            buf.remaining()
        )));
    }

    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|e| StatusError::format(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn encode_varint(val: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, val);
        buf.to_vec()
    }

    fn encode_varlong(val: i64) -> Vec<u8> {
        let mut buf = BytesMut::new();
        write_varlong(&mut buf, val);
        buf.to_vec()
    }

    #[test]
    fn test_varint_golden_vectors() {
        let cases: Vec<(i32, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (25565, vec![0xdd, 0xc7, 0x01]),
            (2097151, vec![0xff, 0xff, 0x7f]),
            (2147483647, vec![0xff, 0xff, 0xff, 0xff, 0x07]),
            (-1, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
            (-2147483648, vec![0x80, 0x80, 0x80, 0x80, 0x08]),
        ];

        for (val, bytes) in cases {
            assert_eq!(encode_varint(val), bytes, "encoding {}", val);
            assert_eq!(varint_len(val), bytes.len(), "length of {}", val);
            let decoded = read_varint(&mut &bytes[..]).unwrap();
            assert_eq!(decoded, val, "decoding {:?}", bytes);
        }
    }

    #[test]
    fn test_varlong_golden_vectors() {
        let cases: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (2147483647, vec![0xff, 0xff, 0xff, 0xff, 0x07]),
            (
                9223372036854775807,
                vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f],
            ),
            (
                -1,
                vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01],
            ),
            (
                -2147483648,
                vec![0x80, 0x80, 0x80, 0x80, 0xf8, 0xff, 0xff, 0xff, 0xff, 0x01],
            ),
            (
                -9223372036854775808,
                vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01],
            ),
        ];

        for (val, bytes) in cases {
            assert_eq!(encode_varlong(val), bytes, "encoding {}", val);
            assert_eq!(varlong_len(val), bytes.len(), "length of {}", val);
            let decoded = read_varlong(&mut &bytes[..]).unwrap();
            assert_eq!(decoded, val, "decoding {:?}", bytes);
        }
    }

    #[test]
    fn test_varint_too_long() {
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(matches!(read_varint(&mut &bytes[..]), Err(StatusError::Format(_))));
        assert!(peek_varint(&bytes).is_err());

        let bytes = [0xffu8; 11];
        assert!(matches!(read_varlong(&mut &bytes[..]), Err(StatusError::Format(_))));
    }

    #[test]
    fn test_varint_truncated() {
        let bytes = [0xddu8, 0xc7];
        assert!(matches!(read_varint(&mut &bytes[..]), Err(StatusError::Format(_))));
        assert_eq!(peek_varint(&bytes).unwrap(), None);
        assert_eq!(peek_varint(&[0xdd, 0xc7, 0x01, 0x42]).unwrap(), Some((25565, 3)));
    }

    #[test]
    fn test_string_roundtrip() {
        for val in ["", "localhost", "{\"text\":\"héllo\"}"] {
            let mut buf = BytesMut::new();
            write_string(&mut buf, val);
            assert_eq!(buf[0] as usize, val.len());
            let decoded = read_string(&mut buf).unwrap();
            assert_eq!(decoded, val);
        }
    }

    #[test]
    fn test_string_length_past_end() {
        let bytes = [0x05u8, b'a', b'b'];
        assert!(matches!(read_string(&mut &bytes[..]), Err(StatusError::Format(_))));
    }
}
