//! # Packet framing
//!
//! Every packet on the wire is:
//!
//! ```text
//! {VARINT length}{VARINT id}{payload}
//! length = varint_len(id) + payload.len()
//! ```
//!
//! [`PacketWriter`] stages fields in memory and produces a [`Packet`];
//! [`PacketCodec`] frames packets for a `tokio_util` `Framed` stream and
//! splits incoming bytes into packets of exactly the announced length.
//! [`PacketReader`] then decodes fields from that bounded payload, so a
//! corrupt field can never read into the next packet.

use crate::codecs::*;
use crate::nbt::{self, NamedTag, Tag};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use mcping_core::{Result, StatusError};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Largest total length a 3-byte VarInt can announce
pub const MAX_PACKET_LEN: usize = 2_097_151;

/// A framed packet: id plus opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    payload: Bytes,
}

impl Packet {
    pub fn new(id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Value of the length prefix: encoded id plus payload
    pub fn size(&self) -> usize {
        varint_len(self.id) + self.payload.len()
    }

    /// Write the complete frame, length prefix included
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(MAX_VARINT_LEN + self.size());
        write_varint(buf, self.size() as i32);
        write_varint(buf, self.id);
        buf.put_slice(&self.payload);
    }

    /// Field reader over this packet's payload
    pub fn reader(&self) -> PacketReader {
        PacketReader {
            id: self.id,
            payload: self.payload.clone(),
        }
    }
}

/// Stages packet fields in memory
#[derive(Debug)]
pub struct PacketWriter {
    id: i32,
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            buf: BytesMut::new(),
        }
    }

    pub fn write_bool(&mut self, val: bool) {
        self.buf.put_u8(val as u8);
    }

    pub fn write_u8(&mut self, val: u8) {
        self.buf.put_u8(val);
    }

    pub fn write_u16(&mut self, val: u16) {
        self.buf.put_u16(val);
    }

    pub fn write_i32(&mut self, val: i32) {
        self.buf.put_i32(val);
    }

    pub fn write_i64(&mut self, val: i64) {
        self.buf.put_i64(val);
    }

    pub fn write_varint(&mut self, val: i32) {
        write_varint(&mut self.buf, val);
    }

    pub fn write_varlong(&mut self, val: i64) {
        write_varlong(&mut self.buf, val);
    }

    /// VarInt-length-prefixed UTF-8 string
    pub fn write_string(&mut self, val: &str) {
        write_string(&mut self.buf, val);
    }

    /// Named tag in the binary tag format
    pub fn write_tag(&mut self, name: &str, tag: &Tag) -> Result<()> {
        nbt::write_named_tag(&mut self.buf, name, tag)
    }

    pub fn finish(self) -> Packet {
        Packet::new(self.id, self.buf.freeze())
    }

    /// Framed bytes, ready for a single write
    pub fn into_frame(self) -> Bytes {
        let mut out = BytesMut::new();
        self.finish().encode(&mut out);
        out.freeze()
    }
}

/// Decodes fields from one packet's payload
#[derive(Debug, Clone)]
pub struct PacketReader {
    id: i32,
    payload: Bytes,
}

impl PacketReader {
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Bytes left in the payload
    pub fn remaining(&self) -> usize {
        self.payload.remaining()
    }

    fn need(&self, len: usize, what: &str) -> Result<()> {
        if self.payload.remaining() < len {
            return Err(StatusError::format(format!(
                "Packet 0x{:02X}: not enough bytes for {}",
                self.id, what
            )));
        }
        Ok(())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1, "u8")?;
        Ok(self.payload.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.need(2, "u16")?;
        Ok(self.payload.get_u16())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.need(4, "i32")?;
        Ok(self.payload.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.need(8, "i64")?;
        Ok(self.payload.get_i64())
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        read_varint(&mut self.payload)
    }

    pub fn read_varlong(&mut self) -> Result<i64> {
        read_varlong(&mut self.payload)
    }

    pub fn read_string(&mut self) -> Result<String> {
        read_string(&mut self.payload)
    }

    pub fn read_tag(&mut self) -> Result<NamedTag> {
        nbt::read_named_tag(&mut self.payload)
    }
}

/// Length-prefix framing for `tokio_util::codec::Framed`
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_len: usize,
}

impl PacketCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.min(MAX_PACKET_LEN),
        }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(MAX_PACKET_LEN)
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = StatusError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        let Some((len, prefix_len)) = peek_varint(&src[..])? else {
            return Ok(None);
        };

        if len < 1 || len as usize > self.max_len {
            return Err(StatusError::format(format!(
                "Invalid packet length {} (max {})",
                len, self.max_len
            )));
        }
        let len = len as usize;

        if src.len() < prefix_len + len {
            src.reserve(prefix_len + len - src.len());
            return Ok(None);
        }

        src.advance(prefix_len);
        let mut body = src.split_to(len).freeze();
        let id = read_varint(&mut body)?;
        if id < 0 {
            return Err(StatusError::format(format!("Negative packet id {}", id)));
        }
        trace!("Decoded packet 0x{:02X} ({} payload bytes)", id, body.len());

        Ok(Some(Packet { id, payload: body }))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = StatusError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<()> {
        if item.size() > self.max_len {
            return Err(StatusError::format(format!(
                "Packet 0x{:02X} of {} bytes exceeds {}",
                item.id(),
                item.size(),
                self.max_len
            )));
        }
        item.encode(dst);
        Ok(())
    }
}
