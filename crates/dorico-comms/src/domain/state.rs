//! Connection state machine.
//!
//! ```text
//! Disconnected ──connect──► Connecting ──ok──► Open ──close/error/stop──► Closing
//!      ▲                        │                                            │
//!      └──────────failed────────┘◄───────────────teardown done───────────────┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    /// Requests may only be written while open.
    #[must_use]
    pub fn accepts_requests(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(text)
    }
}
