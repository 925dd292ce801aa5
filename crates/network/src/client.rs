//! # Status Client
//!
//! Front door tying address resolution to a [`StatusProvider`].
//!
//! # Example
//!
//! ```rust,no_run
//! use mcping_network::{QueryConfig, StatusClient};
//!
//! #[tokio::main]
//! async fn main() -> mcping_core::Result<()> {
//!     let client = StatusClient::new(QueryConfig::default());
//!     let status = client.query_status("play.example.org").await?;
//!     println!("{} players online", status.players().online);
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! All methods take `&self`; one client can serve any number of concurrent
//! queries, which share its SRV cache.

use crate::composite::CompositeStatusProvider;
use crate::config::QueryConfig;
use crate::provider::StatusProvider;
use crate::resolver::{AddressResolver, ServerAddress};
use crate::srv::{SrvLookup, SystemSrvLookup};
use mcping_core::{Result, Status};
use std::time::Duration;
use tracing::debug;

pub struct StatusClient<S = SystemSrvLookup, P = CompositeStatusProvider> {
    resolver: AddressResolver<S>,
    provider: P,
}

impl StatusClient {
    /// System DNS plus the modern-then-legacy provider
    pub fn new(config: QueryConfig) -> Self {
        Self {
            resolver: AddressResolver::new(&config),
            provider: CompositeStatusProvider::new(config),
        }
    }
}

impl<S: SrvLookup, P: StatusProvider> StatusClient<S, P> {
    pub fn with_parts(resolver: AddressResolver<S>, provider: P) -> Self {
        Self { resolver, provider }
    }

    pub fn resolver(&self) -> &AddressResolver<S> {
        &self.resolver
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Resolve an address string without querying
    pub async fn resolve(&self, address: &str) -> Result<ServerAddress> {
        self.resolver.resolve(address).await
    }

    /// Resolve `address` and ask the server for its status
    pub async fn query_status(&self, address: &str) -> Result<Status> {
        let resolved = self.resolve(address).await?;
        self.query_resolved(&resolved).await
    }

    /// Query an already resolved server
    pub async fn query_resolved(&self, address: &ServerAddress) -> Result<Status> {
        let status = self.provider.query(address).await?;
        debug!(
            "{}: {} ({}/{} players, {:?})",
            address,
            status.version().name,
            status.players().online,
            status.players().max,
            status.ping()
        );
        Ok(status)
    }

    /// Latency only
    pub async fn ping(&self, address: &str) -> Result<Duration> {
        Ok(self.query_status(address).await?.ping())
    }
}
