//! # Legacy (pre-handshake) server list ping
//!
//! Servers older than the handshake protocol answer a short magic sequence
//! with a kick packet whose reason string carries the status.
//!
//! ## Request
//!
//! ```text
//! Compatibility: FE 01 FA 00
//! Full:          FE 01 FA {U16 11}{UTF16BE "MC|PingHost"}
//!                {U16 7 + 2*len(host)}{U8 protocol}{U16 len(host)}{UTF16BE host}{I32 port}
//! ```
//!
//! ## Response
//!
//! ```text
//! {U8 0xFF}{U16 code units}{UTF16BE "§1\0<protocol>\0<version>\0<motd>\0<online>\0<max>"}
//! ```

use bytes::{Buf, BufMut, BytesMut};
use mcping_core::{Result, StatusError};

/// Server list ping packet id
pub const PING_PACKET_ID: u8 = 0xFE;
/// Ping payload byte (asks for the extended response)
pub const PING_PAYLOAD: u8 = 0x01;
/// Plugin message packet id
pub const PLUGIN_MESSAGE_ID: u8 = 0xFA;
/// Disconnect/kick packet id, used for the reply
pub const KICK_PACKET_ID: u8 = 0xFF;
/// Plugin channel carrying the target host
pub const PING_HOST_CHANNEL: &str = "MC|PingHost";
/// First field of every extended response
pub const RESPONSE_PREFIX: &str = "§1";
/// Protocol number sent in the full request (1.6.4)
pub const DEFAULT_PROTOCOL_VERSION: u8 = 74;

/// Longest host (in UTF-16 code units) whose length fields fit in a `u16`
pub const MAX_HOST_UNITS: usize = (u16::MAX as usize - 7) / 2;

const FIELD_COUNT: usize = 6;

/// Which request to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyRequestKind {
    /// First four bytes of the full request only
    Compatibility,
    /// Request including the plugin message with host and port
    #[default]
    Full,
}

/// Write `s` as UTF-16BE code units
pub fn write_utf16be(buf: &mut impl BufMut, s: &str) {
    for unit in s.encode_utf16() {
        buf.put_u16(unit);
    }
}

/// Decode UTF-16BE bytes
pub fn decode_utf16be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(StatusError::format("Odd number of bytes in UTF-16BE string"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| StatusError::format("Unpaired surrogate in UTF-16BE string"))
}

/// Build the request bytes
///
/// A host longer than [`MAX_HOST_UNITS`] is rejected before anything is
/// written, even for the compatibility request.
pub fn build_request(
    buf: &mut BytesMut,
    kind: LegacyRequestKind,
    protocol_version: u8,
    host: &str,
    port: u16,
) -> Result<()> {
    let host_units = host.encode_utf16().count();
    if host_units > MAX_HOST_UNITS {
        return Err(StatusError::InvalidAddress(format!(
            "Host of {} UTF-16 units does not fit a legacy request (max {})",
            host_units, MAX_HOST_UNITS
        )));
    }
    let host_units = host_units as u16;

    buf.put_u8(PING_PACKET_ID);
    buf.put_u8(PING_PAYLOAD);
    buf.put_u8(PLUGIN_MESSAGE_ID);

    let channel_len = PING_HOST_CHANNEL.encode_utf16().count() as u16;
    if kind == LegacyRequestKind::Compatibility {
        buf.put_u8((channel_len >> 8) as u8);
        return Ok(());
    }

    buf.put_u16(channel_len);
    write_utf16be(buf, PING_HOST_CHANNEL);

    buf.put_u16(7 + 2 * host_units);
    buf.put_u8(protocol_version);
    buf.put_u16(host_units);
    write_utf16be(buf, host);
    buf.put_i32(port as i32);
    Ok(())
}

/// Status carried by a legacy kick packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyResponse {
    pub protocol_version: i32,
    pub version_name: String,
    pub motd: String,
    pub online: i32,
    pub max: i32,
}

impl LegacyResponse {
    /// Check the first response byte is a kick packet
    pub fn check_packet_id(id: u8) -> Result<()> {
        if id != KICK_PACKET_ID {
            return Err(StatusError::format(format!(
                "Expected kick packet 0x{:02X}, got 0x{:02X}",
                KICK_PACKET_ID, id
            )));
        }
        Ok(())
    }

    /// Parse the NUL-separated reason string
    pub fn parse_fields(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split('\0').collect();
        if fields.len() != FIELD_COUNT {
            return Err(StatusError::format(format!(
                "Legacy response has {} fields, expected {}",
                fields.len(),
                FIELD_COUNT
            )));
        }
        if fields[0] != RESPONSE_PREFIX {
            return Err(StatusError::format(format!(
                "Legacy response prefix {:?} is not {:?}",
                fields[0], RESPONSE_PREFIX
            )));
        }

        Ok(Self {
            protocol_version: parse_number(fields[1], "protocol version")?,
            version_name: fields[2].to_string(),
            motd: fields[3].to_string(),
            online: parse_number(fields[4], "online count")?,
            max: parse_number(fields[5], "max count")?,
        })
    }

    /// Decode a complete kick packet from `buf`
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < 3 {
            return Err(StatusError::format("Legacy response shorter than its header"));
        }
        Self::check_packet_id(buf.get_u8())?;
        let units = buf.get_u16() as usize;
        if buf.remaining() < units * 2 {
            return Err(StatusError::format(format!(
                "Legacy response announces {} code units, only {} bytes follow",
                units,
                buf.remaining()
            )));
        }
        let mut bytes = vec![0u8; units * 2];
        buf.copy_to_slice(&mut bytes);
        Self::parse_fields(&decode_utf16be(&bytes)?)
    }

    /// Reason string in wire order
    pub fn to_fields(&self) -> String {
        [
            RESPONSE_PREFIX.to_string(),
            self.protocol_version.to_string(),
            self.version_name.clone(),
            self.motd.clone(),
            self.online.to_string(),
            self.max.to_string(),
        ]
        .join("\0")
    }

    /// Encode as a kick packet (server side)
    pub fn encode(&self, buf: &mut BytesMut) {
        let text = self.to_fields();
        buf.put_u8(KICK_PACKET_ID);
        buf.put_u16(text.encode_utf16().count() as u16);
        write_utf16be(buf, &text);
    }
}

fn parse_number(field: &str, what: &str) -> Result<i32> {
    field
        .trim()
        .parse()
        .map_err(|_| StatusError::format(format!("Legacy {} is not a number: {:?}", what, field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16be(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
    }

    #[test]
    fn test_compatibility_request() {
        let mut buf = BytesMut::new();
        build_request(&mut buf, LegacyRequestKind::Compatibility, 74, "ignored", 1).unwrap();
        assert_eq!(&buf[..], &[0xFE, 0x01, 0xFA, 0x00][..]);
    }

    #[test]
    fn test_full_request() {
        let mut buf = BytesMut::new();
        build_request(&mut buf, LegacyRequestKind::Full, 74, "localhost", 25565).unwrap();

        let mut expected = vec![0xFE, 0x01, 0xFA, 0x00, 0x0B];
        expected.extend(utf16be("MC|PingHost"));
        expected.extend_from_slice(&[0x00, 7 + 18, 74, 0x00, 0x09]);
        expected.extend(utf16be("localhost"));
        expected.extend_from_slice(&[0x00, 0x00, 0x63, 0xDD]);
        assert_eq!(&buf[..], &expected[..]);

        // Shares its first four bytes with the compatibility request
        assert_eq!(&buf[..4], &[0xFE, 0x01, 0xFA, 0x00][..]);
    }

    #[test]
    fn test_oversized_host_rejected() {
        let longest = "a".repeat(MAX_HOST_UNITS);
        let mut buf = BytesMut::new();
        build_request(&mut buf, LegacyRequestKind::Full, 74, &longest, 25565).unwrap();
        assert_eq!(&buf[27..29], &u16::MAX.to_be_bytes()[..]);

        let too_long = "a".repeat(MAX_HOST_UNITS + 1);
        let mut buf = BytesMut::new();
        let err = build_request(&mut buf, LegacyRequestKind::Full, 74, &too_long, 25565).unwrap_err();
        assert!(matches!(err, StatusError::InvalidAddress(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_golden_response() {
        let text = "§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}3\u{0}20";
        let mut bytes = vec![0xFF];
        bytes.extend_from_slice(&(text.encode_utf16().count() as u16).to_be_bytes());
        bytes.extend(utf16be(text));

        let response = LegacyResponse::decode(&mut &bytes[..]).unwrap();
        assert_eq!(response.protocol_version, 127);
        assert_eq!(response.version_name, "1.6.4");
        assert_eq!(response.motd, "A Minecraft Server");
        assert_eq!(response.online, 3);
        assert_eq!(response.max, 20);
    }

    #[test]
    fn test_five_fields_rejected() {
        let text = "§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}3";
        let mut bytes = vec![0xFF];
        bytes.extend_from_slice(&(text.encode_utf16().count() as u16).to_be_bytes());
        bytes.extend(utf16be(text));

        let err = LegacyResponse::decode(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, StatusError::Format(_)));
    }

    #[test]
    fn test_bad_prefix_and_numbers() {
        assert!(LegacyResponse::parse_fields("§2\u{0}1\u{0}v\u{0}m\u{0}1\u{0}2").is_err());
        assert!(LegacyResponse::parse_fields("§1\u{0}x\u{0}v\u{0}m\u{0}1\u{0}2").is_err());
        assert!(LegacyResponse::parse_fields("§1\u{0}1\u{0}v\u{0}m\u{0}one\u{0}2").is_err());
    }

    #[test]
    fn test_wrong_packet_id() {
        let bytes = [0xFEu8, 0x00, 0x00];
        assert!(matches!(
            LegacyResponse::decode(&mut &bytes[..]),
            Err(StatusError::Format(_))
        ));
    }

    #[test]
    fn test_encode_roundtrip() {
        let response = LegacyResponse {
            protocol_version: 78,
            version_name: "1.6.4".into(),
            motd: "§aGreen §rserver".into(),
            online: 0,
            max: 100,
        };
        let mut buf = BytesMut::new();
        response.encode(&mut buf);
        assert_eq!(LegacyResponse::decode(&mut buf).unwrap(), response);
    }

    #[test]
    fn test_utf16_errors() {
        assert!(decode_utf16be(&[0x00]).is_err());
        assert!(decode_utf16be(&[0xD8, 0x3D]).is_err());
        assert_eq!(decode_utf16be(&[0xD8, 0x3D, 0xDE, 0x00]).unwrap(), "😀");
    }
}
