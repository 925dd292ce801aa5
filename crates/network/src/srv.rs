//! SRV-based port discovery
//!
//! A bare domain may publish its real port as `_minecraft._tcp.<domain>`.
//! The record with the lowest priority wins; ties go to the highest weight.
//!
//! Answers are cached per domain in a [`SrvCache`], shared by every query
//! running on the client. Reads dominate, so the cache is a `DashMap`.

use async_trait::async_trait;
use dashmap::DashMap;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use mcping_core::{Result, StatusError};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Service label queried for every bare domain
pub const SRV_PREFIX: &str = "_minecraft._tcp.";

/// One SRV answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Fully qualified SRV name for `domain`
pub fn srv_name(domain: &str) -> String {
    format!("{}{}.", SRV_PREFIX, domain.trim_end_matches('.'))
}

/// Lowest priority first, then highest weight
pub fn select_record(records: &[SrvRecord]) -> Option<&SrvRecord> {
    records
        .iter()
        .min_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)))
}

/// Source of SRV answers
#[async_trait]
pub trait SrvLookup: Send + Sync {
    /// All records for `name`; an empty vector when none exist
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>>;
}

/// SRV lookups through the system's DNS configuration
pub struct SystemSrvLookup {
    resolver: TokioAsyncResolver,
}

impl SystemSrvLookup {
    /// Use the system resolver configuration, or public defaults when it
    /// cannot be read
    pub fn new() -> Self {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                warn!("Failed to read system DNS configuration ({}), using defaults", e);
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self { resolver }
    }
}

impl Default for SystemSrvLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SrvLookup for SystemSrvLookup {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvRecord>> {
        match self.resolver.srv_lookup(name).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|srv| SrvRecord {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    port: srv.port(),
                    target: srv.target().to_utf8(),
                })
                .collect()),
            Err(e) if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(StatusError::Resolve(format!("SRV lookup for {} failed: {}", name, e))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPort {
    port: Option<u16>,
    expires: Instant,
}

/// Per-domain cache of SRV ports
///
/// `Some(None)` from [`SrvCache::get`] means "known to have no record".
pub struct SrvCache {
    entries: DashMap<String, CachedPort>,
    ttl: Duration,
}

impl SrvCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, domain: &str) -> Option<Option<u16>> {
        let entry = self.entries.get(&domain.to_ascii_lowercase())?;
        if entry.expires <= Instant::now() {
            return None;
        }
        Some(entry.port)
    }

    pub fn insert(&self, domain: &str, port: Option<u16>) {
        self.entries.insert(
            domain.to_ascii_lowercase(),
            CachedPort {
                port,
                expires: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop expired entries
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Port published over SRV for `domain`, consulting `cache` first
///
/// Lookup failures are not cached; empty answers are. A cache miss also
/// drops every expired entry.
pub async fn discover_port(lookup: &dyn SrvLookup, cache: &SrvCache, domain: &str) -> Option<u16> {
    if let Some(cached) = cache.get(domain) {
        trace!("SRV cache hit for {}: {:?}", domain, cached);
        return cached;
    }
    cache.purge_expired();

    let name = srv_name(domain);
    match lookup.lookup_srv(&name).await {
        Ok(records) => {
            let port = select_record(&records).map(|record| record.port);
            debug!("SRV {} -> {:?} ({} records)", name, port, records.len());
            cache.insert(domain, port);
            port
        }
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}
