//! Facade error types.

use dorico_comms::{AbortReason, CommsError};
use dorico_types::responses::ResponseKind;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Operation needs an open, handshaken connection.
    #[error("not connected to Dorico")]
    NotConnected,

    #[error("connection error: {0}")]
    Connection(#[from] CommsError),

    #[error("{tag} request aborted: {reason}")]
    Aborted {
        tag: &'static str,
        reason: AbortReason,
    },

    /// The host answered with `kError`.
    #[error("Dorico rejected {tag}: {code}{}", detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Protocol {
        tag: &'static str,
        code: String,
        detail: Option<String>,
    },

    #[error("{tag} expected a {expected} reply but got {actual}")]
    UnexpectedResponse {
        tag: &'static str,
        expected: ResponseKind,
        actual: ResponseKind,
    },

    #[error("no session token returned")]
    NoSessionToken,

    #[error("unable to connect with session token: host answered {code}")]
    SessionRejected { code: String },

    #[error("no command with name '{0}' found")]
    CommandNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RemoteError {
    /// True when the failure came from the wait rather than the host.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            Self::Aborted { .. } | Self::Connection(CommsError::RequestAborted(_))
        )
    }
}
