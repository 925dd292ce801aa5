//! mcping - server status from the command line
//!
//! Queries every address concurrently and prints one JSON status per line.

mod parse_args;

use anyhow::{bail, Context};
use futures::future::join_all;
use mcping_config::ClientConfig;
use mcping_network::{AddressResolver, LegacyStatusProvider, StatusClient, StatusProvider, SrvLookup};
use mcping_protocol::LegacyRequestKind;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args::parse_args().context("Invalid arguments")?;

    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?,
        None => ClientConfig::default(),
    };
    if args.compat {
        config.query.legacy_request = LegacyRequestKind::Compatibility;
    }
    config.display();

    let addresses = if args.addresses.is_empty() {
        config.servers.clone()
    } else {
        args.addresses.clone()
    };
    if addresses.is_empty() {
        bail!("No server address given (try --help)");
    }

    let failures = if args.legacy_only {
        let resolver = AddressResolver::new(&config.query);
        let client = StatusClient::with_parts(resolver, LegacyStatusProvider::new(config.query.clone()));
        query_all(&client, &addresses).await
    } else {
        query_all(&StatusClient::new(config.query.clone()), &addresses).await
    };

    if failures > 0 {
        bail!("{} of {} queries failed", failures, addresses.len());
    }
    Ok(())
}

/// Query every address at once; returns how many failed
async fn query_all<S: SrvLookup, P: StatusProvider>(client: &StatusClient<S, P>, addresses: &[String]) -> usize {
    let results = join_all(addresses.iter().map(|address| client.query_status(address))).await;

    let mut failures = 0;
    for (address, result) in addresses.iter().zip(results) {
        match result.and_then(|status| status.to_json()) {
            Ok(json) => {
                info!("{} answered", address);
                println!("{}", json);
            }
            Err(e) => {
                error!("{}: {}", address, e);
                failures += 1;
            }
        }
    }
    failures
}
