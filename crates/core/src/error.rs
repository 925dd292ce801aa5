//! Core error types for mcping

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum StatusError {
    /// Malformed bytes, JSON or field counts
    #[error("Format error: {0}")]
    Format(String),

    /// Refused, reset or prematurely closed connection
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A tag tree would break a List/Compound invariant
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StatusError {
    /// True when the remote host actively refused the TCP connection.
    ///
    /// The composite provider never falls back to the legacy protocol in
    /// this case: the port is closed for both generations.
    pub fn is_connection_refused(&self) -> bool {
        matches!(self, StatusError::Connection(e) if e.kind() == io::ErrorKind::ConnectionRefused)
    }

    pub fn format(msg: impl Into<String>) -> Self {
        StatusError::Format(msg.into())
    }
}

impl From<serde_json::Error> for StatusError {
    fn from(err: serde_json::Error) -> Self {
        StatusError::Format(format!("Invalid status JSON: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, StatusError>;
