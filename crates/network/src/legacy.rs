//! # Legacy Status Provider
//!
//! Status query for servers that predate the handshake protocol.
//!
//! # Format
//!
//! One request, one kick packet back (see [`mcping_protocol::legacy`]).
//! There is no separate ping: the reported latency is the time from sending
//! the request to having read the whole response.

use crate::config::QueryConfig;
use crate::provider::{connect, with_timeout, StatusProvider};
use crate::resolver::ServerAddress;
use async_trait::async_trait;
use bytes::BytesMut;
use mcping_core::{Description, Players, Result, Status, StatusError, Version};
use mcping_protocol::legacy::{build_request, decode_utf16be};
use mcping_protocol::{LegacyRequestKind, LegacyResponse};
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Queries servers over the legacy ping
#[derive(Debug, Clone, Default)]
pub struct LegacyStatusProvider {
    config: QueryConfig,
}

impl LegacyStatusProvider {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Run the exchange on an already connected stream
    pub async fn exchange(&self, mut stream: TcpStream, address: &ServerAddress) -> Result<Status> {
        let mut request = BytesMut::new();
        build_request(
            &mut request,
            self.config.legacy_request,
            self.config.legacy_protocol_version,
            address.host(),
            address.port(),
        )?;

        let started = Instant::now();
        stream.write_all(&request).await?;
        stream.flush().await?;
        trace!("Sent {} byte {:?} legacy request to {}", request.len(), self.config.legacy_request, address);

        let limit = self.config.read_timeout;
        let id = with_timeout(limit, "waiting for legacy response", stream.read_u8()).await??;
        LegacyResponse::check_packet_id(id)?;

        let units = with_timeout(limit, "reading legacy response length", stream.read_u16()).await?? as usize;
        let mut text = vec![0u8; units * 2];
        with_timeout(limit, "reading legacy response", stream.read_exact(&mut text)).await??;
        let ping = started.elapsed();

        let response = LegacyResponse::parse_fields(&decode_utf16be(&text)?)?;
        debug!(
            "Legacy status from {}: {} (protocol {}) in {:?}",
            address, response.version_name, response.protocol_version, ping
        );

        Ok(Status::new(
            Version {
                name: response.version_name,
                protocol: response.protocol_version,
            },
            Players {
                online: response.online,
                max: response.max,
                sample: None,
            },
            Description::Legacy(response.motd),
            None,
            ping,
        ))
    }
}

#[async_trait]
impl StatusProvider for LegacyStatusProvider {
    async fn query(&self, address: &ServerAddress) -> Result<Status> {
        debug!("Legacy status query to {}", address);
        let stream = connect(address.socket_addr(), self.config.connect_timeout).await?;
        self.exchange(stream, address).await.map_err(|e| match e {
            // A short read means the server hung up mid-response
            StatusError::Connection(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                StatusError::format(format!("{} closed the connection early", address))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn kick(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF];
        bytes.extend_from_slice(&(text.encode_utf16().count() as u16).to_be_bytes());
        bytes.extend(text.encode_utf16().flat_map(|u| u.to_be_bytes()));
        bytes
    }

    /// Reads `expect` request bytes, then writes `reply` and closes
    async fn spawn_server(expect: usize, reply: Vec<u8>) -> (SocketAddr, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; expect];
            stream.read_exact(&mut request).await.unwrap();
            stream.write_all(&reply).await.unwrap();
            request
        });
        (addr, handle)
    }

    fn provider(kind: LegacyRequestKind) -> LegacyStatusProvider {
        LegacyStatusProvider::new(QueryConfig {
            legacy_request: kind,
            read_timeout: Duration::from_millis(500),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_full_request_and_response() {
        let mut expected = BytesMut::new();
        build_request(&mut expected, LegacyRequestKind::Full, 74, "localhost", 0).unwrap();
        let reply = kick("§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}3\u{0}20");
        let (addr, server) = spawn_server(expected.len(), reply).await;

        let status = provider(LegacyRequestKind::Full)
            .query(&ServerAddress::new("localhost", addr))
            .await
            .unwrap();

        assert_eq!(status.version().name, "1.6.4");
        assert_eq!(status.version().protocol, 127);
        assert_eq!(status.players().online, 3);
        assert_eq!(status.players().max, 20);
        assert!(status.players().sample.is_none());
        assert_eq!(status.description(), &Description::Legacy("A Minecraft Server".into()));
        assert!(status.favicon().is_none());

        let request = server.await.unwrap();
        assert_eq!(&request[..4], &[0xFE, 0x01, 0xFA, 0x00][..]);
        assert_eq!(&request[request.len() - 2..], &addr.port().to_be_bytes()[..]);
    }

    #[tokio::test]
    async fn test_compatibility_request() {
        let reply = kick("§1\u{0}61\u{0}1.5.2\u{0}Old\u{0}0\u{0}8");
        let (addr, server) = spawn_server(4, reply).await;

        let status = provider(LegacyRequestKind::Compatibility)
            .query(&ServerAddress::new("localhost", addr))
            .await
            .unwrap();
        assert_eq!(status.players().max, 8);
        assert_eq!(server.await.unwrap(), vec![0xFE, 0x01, 0xFA, 0x00]);
    }

    #[tokio::test]
    async fn test_five_fields_is_format_error() {
        let reply = kick("§1\u{0}127\u{0}1.6.4\u{0}A Minecraft Server\u{0}3");
        let (addr, _server) = spawn_server(4, reply).await;

        let err = provider(LegacyRequestKind::Compatibility)
            .query(&ServerAddress::new("localhost", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::Format(_)), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_not_a_kick_packet() {
        let (addr, _server) = spawn_server(4, vec![0x00, 0x01, 0x02]).await;
        let err = provider(LegacyRequestKind::Compatibility)
            .query(&ServerAddress::new("localhost", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::Format(_)), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_oversized_host_fails_before_sending() {
        let (addr, _server) = spawn_server(4, Vec::new()).await;
        let host = "a".repeat(mcping_protocol::legacy::MAX_HOST_UNITS + 1);

        let err = provider(LegacyRequestKind::Full)
            .query(&ServerAddress::new(host, addr))
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::InvalidAddress(_)), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_truncated_response() {
        let mut reply = kick("§1\u{0}127\u{0}1.6.4\u{0}motd\u{0}3\u{0}20");
        reply.truncate(10);
        let (addr, _server) = spawn_server(4, reply).await;

        let err = provider(LegacyRequestKind::Compatibility)
            .query(&ServerAddress::new("localhost", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::Format(_)), "unexpected error: {}", err);
    }
}
