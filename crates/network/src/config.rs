//! # Query Configuration
//!
//! Options shared by the resolver and the status providers.
//!
//! # Example
//!
//! ```rust
//! use mcping_network::QueryConfig;
//! use std::time::Duration;
//!
//! let config = QueryConfig {
//!     connect_timeout: Duration::from_secs(2),
//!     read_timeout: Duration::from_secs(3),
//!     ..Default::default()
//! };
//! ```

use mcping_protocol::legacy::{LegacyRequestKind, DEFAULT_PROTOCOL_VERSION as LEGACY_PROTOCOL_VERSION};
use mcping_protocol::MAX_PACKET_LEN;
use std::time::Duration;

/// Conventional server port, used when neither the address nor SRV names one
pub const DEFAULT_PORT: u16 = 25565;

/// Protocol version announced in the modern handshake (1.8)
pub const DEFAULT_PROTOCOL_VERSION: i32 = 47;

/// Status query options
///
/// # Default Values
///
/// - 5-second connect and read timeouts
/// - Protocol 47 for the modern handshake, 74 for the legacy request
/// - Full legacy request
/// - Port 25565
/// - SRV answers cached for 5 minutes
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// How long to wait for the TCP connection to open
    ///
    /// # Default
    /// 5 seconds
    pub connect_timeout: Duration,

    /// How long to wait for each read from the server
    ///
    /// # Default
    /// 5 seconds
    ///
    /// # Notes
    /// - Applies to every packet (modern) or read call (legacy)
    /// - Expiry is reported as a timeout, which the composite provider
    ///   answers by trying the legacy protocol
    pub read_timeout: Duration,

    /// Protocol version sent in the modern handshake
    ///
    /// # Default
    /// 47
    pub protocol_version: i32,

    /// Protocol version byte sent in the full legacy request
    ///
    /// # Default
    /// 74
    pub legacy_protocol_version: u8,

    /// Which legacy request to send
    ///
    /// # Default
    /// `LegacyRequestKind::Full`
    pub legacy_request: LegacyRequestKind,

    /// Port used when an address has none and SRV gives none
    ///
    /// # Default
    /// 25565
    pub default_port: u16,

    /// Largest accepted packet (length prefix value)
    ///
    /// # Default
    /// 2097151 bytes
    pub max_packet_len: usize,

    /// How long SRV answers (including "no record") stay cached
    ///
    /// # Default
    /// 300 seconds
    pub srv_cache_ttl: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            legacy_protocol_version: LEGACY_PROTOCOL_VERSION,
            legacy_request: LegacyRequestKind::Full,
            default_port: DEFAULT_PORT,
            max_packet_len: MAX_PACKET_LEN,
            srv_cache_ttl: Duration::from_secs(300),
        }
    }
}
