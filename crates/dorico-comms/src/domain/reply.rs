//! What a caller gets back from `send`.

use dorico_types::responses::{CodeResponse, Envelope, Response};
use std::fmt;

/// Why a wait ended without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// The caller's cancellation token fired.
    Canceled,
    TimedOut,
    /// The connection closed or failed while the request was outstanding.
    Disconnected,
    /// Writing the request to the transport failed.
    SendFailed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Canceled => "canceled",
            Self::TimedOut => "timed out",
            Self::Disconnected => "disconnected",
            Self::SendFailed => "send failed",
        };
        f.write_str(text)
    }
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A response of the declared kind, with the text it came in.
    Response(Envelope),
    /// The host answered with `kError`.
    Error(CodeResponse),
    Aborted(AbortReason),
}

impl Reply {
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// The response, if one arrived.
    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(envelope) => Some(envelope.response),
            _ => None,
        }
    }

    /// Host text of the response, if one arrived.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Response(envelope) => Some(envelope.raw()),
            _ => None,
        }
    }
}
