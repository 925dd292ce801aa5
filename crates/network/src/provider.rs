//! Status provider trait and shared socket helpers

use crate::resolver::ServerAddress;
use async_trait::async_trait;
use mcping_core::{Result, Status, StatusError};
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Something that can ask a server for its status
///
/// Each call makes exactly one connect-and-read attempt on its own socket.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn query(&self, address: &ServerAddress) -> Result<Status>;
}

/// Run `fut`, turning an elapsed deadline into [`StatusError::Timeout`]
pub(crate) async fn with_timeout<F: Future>(limit: Duration, what: &str, fut: F) -> Result<F::Output> {
    timeout(limit, fut)
        .await
        .map_err(|_| StatusError::Timeout(format!("{} after {:?}", what, limit)))
}

/// Open a TCP connection with Nagle disabled
pub(crate) async fn connect(addr: SocketAddr, limit: Duration) -> Result<TcpStream> {
    trace!("Connecting to {}", addr);
    let stream = with_timeout(limit, &format!("connecting to {}", addr), TcpStream::connect(addr)).await??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Milliseconds since the Unix epoch
pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
