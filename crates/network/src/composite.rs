//! Modern-then-legacy status provider
//!
//! The modern protocol is tried first. If the server refused the connection
//! there is nothing listening and the error is returned as is; any other
//! failure (timeout, garbled reply, early close) gets one legacy attempt on
//! a fresh connection, whose result is final.

use crate::config::QueryConfig;
use crate::legacy::LegacyStatusProvider;
use crate::modern::ModernStatusProvider;
use crate::provider::StatusProvider;
use crate::resolver::ServerAddress;
use async_trait::async_trait;
use mcping_core::{Result, Status};
use tracing::{debug, info};

pub struct CompositeStatusProvider<M = ModernStatusProvider, L = LegacyStatusProvider> {
    modern: M,
    legacy: L,
}

impl CompositeStatusProvider {
    pub fn new(config: QueryConfig) -> Self {
        Self::with_providers(ModernStatusProvider::new(config.clone()), LegacyStatusProvider::new(config))
    }
}

impl<M: StatusProvider, L: StatusProvider> CompositeStatusProvider<M, L> {
    pub fn with_providers(modern: M, legacy: L) -> Self {
        Self { modern, legacy }
    }

    pub fn modern(&self) -> &M {
        &self.modern
    }

    pub fn legacy(&self) -> &L {
        &self.legacy
    }
}

#[async_trait]
impl<M: StatusProvider, L: StatusProvider> StatusProvider for CompositeStatusProvider<M, L> {
    async fn query(&self, address: &ServerAddress) -> Result<Status> {
        match self.modern.query(address).await {
            Ok(status) => Ok(status),
            Err(e) if e.is_connection_refused() => {
                debug!("{} refused the connection", address);
                Err(e)
            }
            Err(e) => {
                info!("Modern query to {} failed ({}), trying legacy", address, e);
                self.legacy.query(address).await
            }
        }
    }
}
