//! mcping Configuration Management
//!
//! Loads client options from a `key = value` file.
//!
//! # Format
//!
//! ```text
//! # Timeouts in milliseconds
//! connecttimeout = 3000
//! readtimeout = 5000
//! protocol = 47
//! legacyprotocol = 74
//! legacyrequest = full        # or "compat"
//! defaultport = 25565
//! maxpacket = 2097151
//! srvcachettl = 300           # seconds
//! server = play.example.org   # repeatable, queried when no address is given
//! ```
//!
//! Unknown keys and unparsable values are logged and skipped; the default
//! stays in place.

use mcping_network::QueryConfig;
use mcping_protocol::LegacyRequestKind;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Complete client configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Options handed to the resolver and providers
    pub query: QueryConfig,
    /// Servers to query when the command line names none (from "server")
    pub servers: Vec<String>,
}

impl ClientConfig {
    /// Load configuration from an options file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse options file content
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            // Strip trailing comments
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => config.parse_option(&key.trim().to_ascii_lowercase(), value.trim()),
                None => warn!("Line {}: expected `key = value`, got {:?}", number + 1, line),
            }
        }

        config
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        let query = &mut self.query;
        match key {
            "connecttimeout" => {
                if let Some(ms) = parse_value::<u64>(key, value).filter(|ms| *ms > 0) {
                    query.connect_timeout = Duration::from_millis(ms);
                }
            }
            "readtimeout" => {
                if let Some(ms) = parse_value::<u64>(key, value).filter(|ms| *ms > 0) {
                    query.read_timeout = Duration::from_millis(ms);
                }
            }
            "protocol" => {
                if let Some(version) = parse_value(key, value) {
                    query.protocol_version = version;
                }
            }
            "legacyprotocol" => {
                if let Some(version) = parse_value(key, value) {
                    query.legacy_protocol_version = version;
                }
            }
            "legacyrequest" => match value.to_ascii_lowercase().as_str() {
                "full" => query.legacy_request = LegacyRequestKind::Full,
                "compat" | "compatibility" => query.legacy_request = LegacyRequestKind::Compatibility,
                _ => warn!("Invalid value for legacyrequest: {:?}, keeping {:?}", value, query.legacy_request),
            },
            "defaultport" => {
                if let Some(port) = parse_value::<u16>(key, value).filter(|port| *port > 0) {
                    query.default_port = port;
                }
            }
            "maxpacket" => {
                if let Some(len) = parse_value::<usize>(key, value).filter(|len| *len > 0) {
                    query.max_packet_len = len;
                }
            }
            "srvcachettl" => {
                if let Some(secs) = parse_value(key, value) {
                    query.srv_cache_ttl = Duration::from_secs(secs);
                }
            }
            "server" => {
                if !value.is_empty() {
                    self.servers.push(value.to_string());
                }
            }
            _ => warn!("Unknown config option: {} = {}", key, value),
        }
    }

    /// Log the effective configuration
    pub fn display(&self) {
        let query = &self.query;
        tracing::info!("Query configuration:");
        tracing::info!("  Connect timeout: {:?}", query.connect_timeout);
        tracing::info!("  Read timeout: {:?}", query.read_timeout);
        tracing::info!("  Protocol: {} (legacy {}, {:?} request)", query.protocol_version, query.legacy_protocol_version, query.legacy_request);
        tracing::info!("  Default port: {}", query.default_port);
        tracing::info!("  Max packet: {} bytes", query.max_packet_len);
        tracing::info!("  SRV cache TTL: {:?}", query.srv_cache_ttl);
        if !self.servers.is_empty() {
            tracing::info!("  Servers: {}", self.servers.join(", "));
        }
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Invalid value for {}: {:?}, keeping default", key, value);
            None
        }
    }
}
