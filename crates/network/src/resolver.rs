//! Address resolution: string -> [`ServerAddress`]
//!
//! 1. Parse the string ([`parse_address`])
//! 2. For a bare domain, ask SRV for the port (falling back to the default)
//! 3. Resolve the domain to a socket address

use crate::address::{parse_address, Host, PortMode};
use crate::config::QueryConfig;
use crate::srv::{discover_port, SrvCache, SrvLookup, SystemSrvLookup};
use mcping_core::{Result, StatusError};
use std::fmt;
use std::net::SocketAddr;
use tracing::debug;

/// A resolved server: the host name as the user gave it plus the socket
/// address to connect to
///
/// The host name is sent in the handshake, so it is kept alongside the
/// resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    host: String,
    addr: SocketAddr,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            host: host.into(),
            addr,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl From<SocketAddr> for ServerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.addr.port())
    }
}

/// Turns address strings into [`ServerAddress`]es
pub struct AddressResolver<S = SystemSrvLookup> {
    srv: S,
    cache: SrvCache,
    default_port: u16,
}

impl AddressResolver<SystemSrvLookup> {
    pub fn new(config: &QueryConfig) -> Self {
        Self::with_lookup(SystemSrvLookup::new(), config)
    }
}

impl<S: SrvLookup> AddressResolver<S> {
    pub fn with_lookup(srv: S, config: &QueryConfig) -> Self {
        Self {
            srv,
            cache: SrvCache::new(config.srv_cache_ttl),
            default_port: config.default_port,
        }
    }

    pub fn srv_cache(&self) -> &SrvCache {
        &self.cache
    }

    /// Port to use for `domain` when the address named none
    pub async fn srv_port(&self, domain: &str) -> u16 {
        discover_port(&self.srv, &self.cache, domain)
            .await
            .unwrap_or(self.default_port)
    }

    /// Resolve an address string
    pub async fn resolve(&self, input: &str) -> Result<ServerAddress> {
        let parsed = parse_address(input, PortMode::Optional(self.default_port))?;
        let explicit_port = parsed.explicit_port.then_some(parsed.port).flatten();

        match parsed.host {
            Host::Ipv4(ip) => {
                let port = explicit_port.unwrap_or(self.default_port);
                Ok(ServerAddress::new(ip.to_string(), SocketAddr::new(ip.into(), port)))
            }
            Host::Domain(domain) => {
                let port = match explicit_port {
                    Some(port) => port,
                    None => self.srv_port(&domain).await,
                };

                let addr = tokio::net::lookup_host((domain.as_str(), port))
                    .await
                    .map_err(|e| StatusError::Resolve(format!("{}: {}", domain, e)))?
                    .next()
                    .ok_or_else(|| StatusError::Resolve(format!("{}: no addresses", domain)))?;

                debug!("Resolved {} to {}", input.trim(), addr);
                Ok(ServerAddress::new(domain, addr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srv::SrvRecord;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;

    struct StaticSrv(Vec<SrvRecord>);

    #[async_trait]
    impl SrvLookup for StaticSrv {
        async fn lookup_srv(&self, _name: &str) -> Result<Vec<SrvRecord>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSrv;

    #[async_trait]
    impl SrvLookup for FailingSrv {
        async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>> {
            Err(StatusError::Resolve(format!("{}: SERVFAIL", name)))
        }
    }

    #[tokio::test]
    async fn test_ipv4_literal_skips_lookups() {
        let resolver = AddressResolver::with_lookup(FailingSrv, &QueryConfig::default());
        let address = resolver.resolve(" 10.  0. 255  .8  : 655 ").await.unwrap();
        assert_eq!(
            address.socket_addr(),
            SocketAddr::new(Ipv4Addr::new(10, 0, 255, 8).into(), 655)
        );
        assert_eq!(address.host(), "10.0.255.8");
        assert!(resolver.srv_cache().is_empty());
    }

    #[tokio::test]
    async fn test_ipv4_literal_default_port() {
        let resolver = AddressResolver::with_lookup(FailingSrv, &QueryConfig::default());
        let address = resolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(address.port(), 25565);
    }

    #[tokio::test]
    async fn test_domain_without_srv_uses_default_port() {
        let resolver = AddressResolver::with_lookup(StaticSrv(Vec::new()), &QueryConfig::default());
        assert_eq!(resolver.srv_port("localhost").await, 25565);

        let address = resolver.resolve("localhost").await.unwrap();
        assert_eq!(address.port(), 25565);
        assert_eq!(address.host(), "localhost");
    }

    #[tokio::test]
    async fn test_failed_srv_uses_default_port() {
        let resolver = AddressResolver::with_lookup(FailingSrv, &QueryConfig::default());
        assert_eq!(resolver.srv_port("example.org").await, 25565);
    }

    #[tokio::test]
    async fn test_domain_uses_srv_port() {
        let records = vec![
            SrvRecord { priority: 5, weight: 0, port: 1111, target: "a.".into() },
            SrvRecord { priority: 1, weight: 10, port: 2222, target: "b.".into() },
        ];
        let resolver = AddressResolver::with_lookup(StaticSrv(records), &QueryConfig::default());
        let address = resolver.resolve("localhost").await.unwrap();
        assert_eq!(address.port(), 2222);
    }

    #[tokio::test]
    async fn test_explicit_port_skips_srv() {
        let resolver = AddressResolver::with_lookup(FailingSrv, &QueryConfig::default());
        let address = resolver.resolve("localhost:30000").await.unwrap();
        assert_eq!(address.port(), 30000);
        assert!(resolver.srv_cache().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let resolver = AddressResolver::with_lookup(FailingSrv, &QueryConfig::default());
        let long_label = format!("{}.com", "x".repeat(64));
        let err = resolver.resolve(&long_label).await.unwrap_err();
        assert!(matches!(err, StatusError::InvalidAddress(_)));
    }

    #[test]
    fn test_display() {
        let address = ServerAddress::new("play.example.org", "192.0.2.1:25565".parse().unwrap());
        assert_eq!(address.to_string(), "play.example.org:25565");
        let from_socket = ServerAddress::from("192.0.2.1:1234".parse::<SocketAddr>().unwrap());
        assert_eq!(from_socket.host(), "192.0.2.1");
    }
}
