//! # mcping Networking Layer
//!
//! Tokio-based status queries against game servers.
//!
//! ## Modules
//!
//! - [`config`] - Query options
//! - [`address`] - Address string parsing
//! - [`srv`] - SRV port discovery and its cache
//! - [`resolver`] - Address string to socket address
//! - [`provider`] - The [`StatusProvider`] trait
//! - [`modern`] - Handshake-based status query
//! - [`legacy`] - Pre-handshake status query
//! - [`composite`] - Modern first, legacy as fallback
//! - [`client`] - Resolution plus query in one call
//!
//! ## Flow
//!
//! ```text
//! "play.example.org"
//!     → AddressResolver (parse, SRV, DNS)
//!     → CompositeStatusProvider
//!         → ModernStatusProvider ──(failed, not refused)──→ LegacyStatusProvider
//!     → Status
//! ```

pub mod address;
pub mod client;
pub mod composite;
pub mod config;
pub mod legacy;
pub mod modern;
pub mod provider;
pub mod resolver;
pub mod srv;

// Re-export commonly used items
pub use address::{parse_address, Host, ParsedAddress, PortMode};
pub use client::StatusClient;
pub use composite::CompositeStatusProvider;
pub use config::QueryConfig;
pub use legacy::LegacyStatusProvider;
pub use modern::{ExchangeState, ModernStatusProvider};
pub use provider::StatusProvider;
pub use resolver::{AddressResolver, ServerAddress};
pub use srv::{SrvCache, SrvLookup, SrvRecord, SystemSrvLookup};
