//! # Modern Status Provider
//!
//! Status query over the handshake-based protocol.
//!
//! # Lifecycle
//!
//! ```text
//! Init → HandshakeSent → StatusRequested → PingSent → Done
//!   ↓          ↓               ↓              ↓
//!                         Failed
//! ```
//!
//! All three requests go out in one flush. The server's status response and
//! pong may then arrive in either order; reading stops once both have been
//! seen or the server closes the stream.

use crate::config::QueryConfig;
use crate::provider::{connect, epoch_millis, with_timeout, StatusProvider};
use crate::resolver::ServerAddress;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use mcping_core::{Result, Status, StatusError};
use mcping_protocol::{build_ping, build_status_request, Handshake, PacketCodec, StatusPacket};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, trace, warn};

/// Where a modern exchange is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Init,
    HandshakeSent,
    StatusRequested,
    PingSent,
    Done,
    Failed,
}

/// Queries servers that speak the handshake protocol
#[derive(Debug, Clone, Default)]
pub struct ModernStatusProvider {
    config: QueryConfig,
}

impl ModernStatusProvider {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Run the exchange on an already connected stream
    ///
    /// The stream is consumed and closed when this returns, whatever the
    /// outcome.
    pub async fn exchange(&self, stream: TcpStream, address: &ServerAddress) -> Result<Status> {
        let mut state = ExchangeState::Init;
        let result = self.run(stream, address, &mut state).await;
        match &result {
            Ok(_) => trace!("Status exchange with {} finished in {:?}", address, state),
            Err(e) => {
                debug!("Status exchange with {} failed in {:?}: {}", address, state, e);
                state = ExchangeState::Failed;
                trace!("Exchange state: {:?}", state);
            }
        }
        result
    }

    async fn run(&self, stream: TcpStream, address: &ServerAddress, state: &mut ExchangeState) -> Result<Status> {
        let mut framed = Framed::new(stream, PacketCodec::new(self.config.max_packet_len));

        let handshake = Handshake::status(self.config.protocol_version, address.host(), address.port());
        framed.feed(handshake.to_packet()).await?;
        *state = ExchangeState::HandshakeSent;

        framed.feed(build_status_request()).await?;
        *state = ExchangeState::StatusRequested;

        framed.send(build_ping(epoch_millis())).await?;
        *state = ExchangeState::PingSent;

        let mut body: Option<String> = None;
        let mut ping: Option<Duration> = None;

        while body.is_none() || ping.is_none() {
            let next = with_timeout(self.config.read_timeout, "waiting for status packet", framed.next()).await?;
            let Some(packet) = next else {
                trace!("{} closed the stream", address);
                break;
            };

            match StatusPacket::from_packet(&packet?)? {
                StatusPacket::Response(json) => {
                    trace!("Status response from {} ({} bytes)", address, json.len());
                    body = Some(json);
                }
                StatusPacket::Pong(echoed) => ping = Some(ping_from_echo(epoch_millis(), echoed)),
            }
        }

        let body = body.ok_or_else(|| StatusError::format(format!("{} sent no status response", address)))?;
        let ping = ping.unwrap_or_else(|| {
            warn!("{} did not answer the ping, reporting 0 ms", address);
            Duration::ZERO
        });

        let status = Status::from_json(&body, ping)?;
        *state = ExchangeState::Done;
        Ok(status)
    }
}

/// Half the round trip implied by an echoed timestamp
///
/// An echo from the future gives zero; one so far in the past that the
/// difference overflows is not a timestamp we sent, and also gives zero.
pub fn ping_from_echo(now: i64, echoed: i64) -> Duration {
    match now.checked_sub(echoed) {
        Some(round_trip) if round_trip >= 0 => Duration::from_millis(round_trip as u64 / 2),
        Some(_) => Duration::ZERO,
        None => {
            warn!("Pong echoed an impossible timestamp {}, reporting 0 ms", echoed);
            Duration::ZERO
        }
    }
}

#[async_trait]
impl StatusProvider for ModernStatusProvider {
    async fn query(&self, address: &ServerAddress) -> Result<Status> {
        debug!("Modern status query to {}", address);
        let stream = connect(address.socket_addr(), self.config.connect_timeout).await?;
        self.exchange(stream, address).await
    }
}
