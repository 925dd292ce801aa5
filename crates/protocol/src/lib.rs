//! # mcping Protocol Library
//!
//! Wire formats needed to ask a game server for its status, with exact
//! byte-level compatibility with real servers.
//!
//! ## Architecture
//!
//! ### 1. Codecs Layer ([`codecs`])
//! - VarInt: 1-5 byte variable-length i32
//! - VarLong: 1-10 byte variable-length i64
//! - String: VarInt byte length + UTF-8
//!
//! ### 2. Binary Tags ([`nbt`], [`mutf8`])
//! The recursive tagged tree format, with its modified UTF-8 strings.
//!
//! ### 3. Packet Framing ([`packet`])
//! `{VARINT length}{VARINT id}{payload}` envelopes, a staging writer, a
//! bounded reader and a `tokio_util` codec.
//!
//! ### 4. Status Packets ([`packets`])
//! Handshake, status request/response and ping/pong.
//!
//! ### 5. Legacy Ping ([`legacy`])
//! The pre-handshake `FE 01` request and its UTF-16BE kick-packet reply.
//!
//! ## Usage Example
//!
//! ```rust
//! use mcping_protocol::{Handshake, PacketCodec, build_status_request};
//! use bytes::BytesMut;
//! use tokio_util::codec::Encoder;
//!
//! let mut codec = PacketCodec::default();
//! let mut buf = BytesMut::new();
//! codec.encode(Handshake::status(47, "localhost", 25565).to_packet(), &mut buf).unwrap();
//! codec.encode(build_status_request(), &mut buf).unwrap();
//! ```

pub mod codecs;
pub mod legacy;
pub mod mutf8;
pub mod nbt;
pub mod packet;
pub mod packets;

// Re-export commonly used items
pub use codecs::*;
pub use legacy::{LegacyRequestKind, LegacyResponse};
pub use nbt::{Compound, NamedTag, Tag, TagKind, TagList};
pub use packet::{Packet, PacketCodec, PacketReader, PacketWriter, MAX_PACKET_LEN};
pub use packets::*;
