//! Error types for the correlation engine and its transports.

use crate::config::ConfigError;
use crate::domain::AbortReason;
use thiserror::Error;

/// Failures reported by a transport adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connect to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    /// The peer went away without a close handshake.
    #[error("connection lost")]
    ConnectionLost,
}

/// Errors surfaced by [`CommsContext`](crate::CommsContext).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommsError {
    #[error("already connected")]
    AlreadyConnected,

    /// A send or stop was attempted without an open connection. Nothing was
    /// written to the transport.
    #[error("not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    ConnectFailed(#[source] TransportError),

    /// The wait for a reply ended without one.
    #[error("request aborted: {0}")]
    RequestAborted(AbortReason),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
