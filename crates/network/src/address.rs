//! Server address parsing
//!
//! Accepts an IPv4 literal or a domain name, each with an optional `:port`.
//! Whitespace around the dot-separated components and around the port is
//! tolerated: every piece is trimmed, then validated strictly.
//!
//! ```text
//! " 10.  0. 255  .8  : 655 "  ->  10.0.255.8:655
//! "Play.Example.org"          ->  domain, no explicit port
//! ```

use mcping_core::{Result, StatusError};
use std::fmt;
use std::net::Ipv4Addr;

/// Longest accepted domain name
pub const MAX_DOMAIN_LEN: usize = 253;

/// Longest accepted domain label
pub const MAX_LABEL_LEN: usize = 63;

/// How a `:port` suffix is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    /// A port is an error
    No,
    /// Use the given port when none is present
    Optional(u16),
    /// A missing port is an error
    Required,
}

/// Host part of a parsed address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    Ipv4(Ipv4Addr),
    Domain(String),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ipv4(ip) => write!(f, "{}", ip),
            Host::Domain(name) => f.write_str(name),
        }
    }
}

/// Result of [`parse_address`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    pub host: Host,
    /// Explicit port, or the default under [`PortMode::Optional`]
    pub port: Option<u16>,
    /// Whether the input itself carried the port
    pub explicit_port: bool,
}

/// Parse and validate an address string
pub fn parse_address(input: &str, mode: PortMode) -> Result<ParsedAddress> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(input, "empty address"));
    }

    let (host_part, port_part) = match input.rfind(':') {
        Some(pos) => (&input[..pos], Some(&input[pos + 1..])),
        None => (input, None),
    };

    let explicit = match port_part {
        Some(raw) => Some(parse_port(input, raw)?),
        None => None,
    };

    let port = match (mode, explicit) {
        (PortMode::No, Some(_)) => return Err(invalid(input, "port not allowed")),
        (PortMode::No, None) => None,
        (PortMode::Optional(default), port) => Some(port.unwrap_or(default)),
        (PortMode::Required, None) => return Err(invalid(input, "port required")),
        (PortMode::Required, Some(port)) => Some(port),
    };

    Ok(ParsedAddress {
        host: parse_host(input, host_part)?,
        port,
        explicit_port: explicit.is_some(),
    })
}

fn parse_port(input: &str, raw: &str) -> Result<u16> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, "port must be numeric"));
    }
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid(input, "port out of range")),
        Ok(port) => Ok(port),
    }
}

fn parse_host(input: &str, raw: &str) -> Result<Host> {
    let labels: Vec<&str> = raw.split('.').map(str::trim).collect();
    if labels.iter().any(|label| label.is_empty()) {
        return Err(invalid(input, "empty host component"));
    }

    if labels.iter().all(|label| label.bytes().all(|b| b.is_ascii_digit())) {
        return parse_ipv4(input, &labels).map(Host::Ipv4);
    }

    let name = labels.join(".");
    if name.len() > MAX_DOMAIN_LEN {
        return Err(invalid(input, "domain longer than 253 characters"));
    }
    for label in &labels {
        if label.len() > MAX_LABEL_LEN {
            return Err(invalid(input, "domain label longer than 63 characters"));
        }
        if !is_valid_label(label) {
            return Err(invalid(input, "malformed domain label"));
        }
    }

    Ok(Host::Domain(name))
}

fn parse_ipv4(input: &str, octets: &[&str]) -> Result<Ipv4Addr> {
    if octets.len() != 4 {
        return Err(invalid(input, "IPv4 address needs four octets"));
    }
    let mut parsed = [0u8; 4];
    for (slot, octet) in parsed.iter_mut().zip(octets) {
        *slot = octet
            .parse()
            .map_err(|_| invalid(input, "IPv4 octet out of range"))?;
    }
    Ok(Ipv4Addr::from(parsed))
}

/// `[A-Za-z][-A-Za-z0-9]*`
fn is_valid_label(label: &str) -> bool {
    let mut bytes = label.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn invalid(input: &str, reason: &str) -> StatusError {
    StatusError::InvalidAddress(format!("{:?}: {}", input, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaced_ipv4_with_port() {
        let parsed = parse_address(" 10.  0. 255  .8  : 655 ", PortMode::Optional(25565)).unwrap();
        assert_eq!(parsed.host, Host::Ipv4(Ipv4Addr::new(10, 0, 255, 8)));
        assert_eq!(parsed.port, Some(655));
        assert!(parsed.explicit_port);
    }

    #[test]
    fn test_domain_default_port() {
        let parsed = parse_address("play.example.org", PortMode::Optional(25565)).unwrap();
        assert_eq!(parsed.host, Host::Domain("play.example.org".into()));
        assert_eq!(parsed.port, Some(25565));
        assert!(!parsed.explicit_port);
    }

    #[test]
    fn test_spaced_domain() {
        let parsed = parse_address("mc . hypixel . net:25566", PortMode::Required).unwrap();
        assert_eq!(parsed.host.to_string(), "mc.hypixel.net");
        assert_eq!(parsed.port, Some(25566));
    }

    #[test]
    fn test_port_modes() {
        assert!(parse_address("localhost:1", PortMode::No).is_err());
        assert_eq!(parse_address("localhost", PortMode::No).unwrap().port, None);
        assert!(parse_address("localhost", PortMode::Required).is_err());
        assert!(parse_address("localhost:0", PortMode::Required).is_err());
        assert!(parse_address("localhost:65536", PortMode::Required).is_err());
        assert!(parse_address("localhost:12a", PortMode::Required).is_err());
        assert!(parse_address("localhost:", PortMode::Optional(1)).is_err());
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        assert!(parse_address(&ok, PortMode::No).is_ok());

        let too_long = format!("{}.com", "a".repeat(64));
        let err = parse_address(&too_long, PortMode::No).unwrap_err();
        assert!(matches!(err, StatusError::InvalidAddress(_)));
    }

    #[test]
    fn test_domain_length_limit() {
        let label = "a".repeat(63);
        let name = [label.as_str(); 4].join(".");
        assert_eq!(name.len(), 255);
        assert!(parse_address(&name, PortMode::No).is_err());
    }

    #[test]
    fn test_invalid_hosts() {
        for input in [
            "",
            "   ",
            "256.0.0.1",
            "1.2.3",
            "1.2.3.4.5",
            "10..0.1",
            "-bad.example",
            "9gag.com",
            "under_score.net",
            "a.b:c:1",
            "::1",
        ] {
            assert!(parse_address(input, PortMode::Optional(25565)).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_hyphenated_labels() {
        let parsed = parse_address("my-server.a1-b2.net", PortMode::No).unwrap();
        assert_eq!(parsed.host, Host::Domain("my-server.a1-b2.net".into()));
    }
}
