//! # Status exchange packets
//!
//! The modern status exchange uses four serverbound/clientbound packets:
//!
//! ```text
//! C->S 0x00 Handshake       {VARINT protocol}{STRING host}{U16 port}{VARINT next_state}
//! C->S 0x00 StatusRequest   (empty)
//! C->S 0x01 Ping            {I64 payload}
//! S->C 0x00 StatusResponse  {STRING json}
//! S->C 0x01 Pong            {I64 payload}
//! ```

use crate::packet::{Packet, PacketWriter};
use mcping_core::{Result, StatusError};

pub const HANDSHAKE_ID: i32 = 0x00;
pub const STATUS_REQUEST_ID: i32 = 0x00;
pub const PING_ID: i32 = 0x01;
pub const STATUS_RESPONSE_ID: i32 = 0x00;
pub const PONG_ID: i32 = 0x01;

/// `next_state` value that switches the connection into the status state
pub const STATUS_NEXT_STATE: i32 = 1;

/// Opening packet of every modern connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub host: String,
    pub port: u16,
}

impl Handshake {
    /// Handshake that switches the connection into the status state
    pub fn status(protocol_version: i32, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol_version,
            host: host.into(),
            port,
        }
    }

    pub fn to_packet(&self) -> Packet {
        let mut writer = PacketWriter::new(HANDSHAKE_ID);
        writer.write_varint(self.protocol_version);
        writer.write_string(&self.host);
        writer.write_u16(self.port);
        writer.write_varint(STATUS_NEXT_STATE);
        writer.finish()
    }

    /// Decode a status handshake (server side); any other next state is
    /// rejected
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        if packet.id() != HANDSHAKE_ID {
            return Err(StatusError::format(format!(
                "Expected handshake, got packet 0x{:02X}",
                packet.id()
            )));
        }
        let mut reader = packet.reader();
        let protocol_version = reader.read_varint()?;
        let host = reader.read_string()?;
        let port = reader.read_u16()?;
        let state = reader.read_varint()?;
        if state != STATUS_NEXT_STATE {
            return Err(StatusError::format(format!("Handshake next state {} is not status", state)));
        }

        Ok(Self {
            protocol_version,
            host,
            port,
        })
    }
}

/// Build the empty status request
pub fn build_status_request() -> Packet {
    PacketWriter::new(STATUS_REQUEST_ID).finish()
}

/// Build a ping carrying `payload` (the client's timestamp)
pub fn build_ping(payload: i64) -> Packet {
    let mut writer = PacketWriter::new(PING_ID);
    writer.write_i64(payload);
    writer.finish()
}

/// Build a status response (server side; used by test servers)
pub fn build_status_response(json: &str) -> Packet {
    let mut writer = PacketWriter::new(STATUS_RESPONSE_ID);
    writer.write_string(json);
    writer.finish()
}

/// Build a pong echoing `payload`
pub fn build_pong(payload: i64) -> Packet {
    let mut writer = PacketWriter::new(PONG_ID);
    writer.write_i64(payload);
    writer.finish()
}

/// A packet the server may send while in the status state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPacket {
    Response(String),
    Pong(i64),
}

impl StatusPacket {
    /// Classify a clientbound packet; any other id is a format error
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let mut reader = packet.reader();
        match packet.id() {
            STATUS_RESPONSE_ID => Ok(StatusPacket::Response(reader.read_string()?)),
            PONG_ID => Ok(StatusPacket::Pong(reader.read_i64()?)),
            other => Err(StatusError::format(format!(
                "Unexpected packet 0x{:02X} in status state",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_handshake_bytes() {
        let packet = Handshake::status(47, "localhost", 25565).to_packet();
        let mut buf = BytesMut::new();
        packet.encode(&mut buf);

        let mut expected = vec![15, 0x00, 47, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xdd, 0x01]);
        assert_eq!(&buf[..], &expected[..]);
    }

    #[test]
    fn test_handshake_roundtrip() {
        let handshake = Handshake::status(765, "mc.example.org", 19132);
        let decoded = Handshake::from_packet(&handshake.to_packet()).unwrap();
        assert_eq!(decoded, handshake);
    }

    #[test]
    fn test_non_status_handshake_rejected() {
        let mut writer = PacketWriter::new(HANDSHAKE_ID);
        writer.write_varint(47);
        writer.write_string("localhost");
        writer.write_u16(25565);
        writer.write_varint(2);

        let err = Handshake::from_packet(&writer.finish()).unwrap_err();
        assert!(matches!(err, StatusError::Format(_)));
    }

    #[test]
    fn test_status_request_is_empty() {
        let mut buf = BytesMut::new();
        build_status_request().encode(&mut buf);
        assert_eq!(&buf[..], &[1, 0][..]);
    }

    #[test]
    fn test_classify_status_packets() {
        assert_eq!(
            StatusPacket::from_packet(&build_status_response("{}")).unwrap(),
            StatusPacket::Response("{}".into())
        );
        assert_eq!(
            StatusPacket::from_packet(&build_pong(-42)).unwrap(),
            StatusPacket::Pong(-42)
        );

        let err = StatusPacket::from_packet(&Packet::new(0x1A, Vec::new())).unwrap_err();
        assert!(matches!(err, StatusError::Format(_)));
    }

    #[test]
    fn test_short_pong_rejected() {
        let packet = Packet::new(PONG_ID, vec![0u8; 4]);
        assert!(StatusPacket::from_packet(&packet).is_err());
    }
}
