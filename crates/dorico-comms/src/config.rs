//! Engine configuration with validation.

use dorico_types::requests::DEFAULT_HANDSHAKE_VERSION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Address the host listens on out of the box.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:4560";

/// Size of the reusable frame buffer used by the receive loop.
pub const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 1024;

/// Default wait for a reply, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Main engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommsConfig {
    /// WebSocket URL of the host.
    pub address: String,
    /// Protocol version announced in the `connect` handshake.
    pub handshake_version: String,
    /// Bytes read per transport call; larger messages arrive in fragments.
    pub receive_buffer_size: usize,
    /// Log every sent and received message at `debug`.
    pub echo: bool,
    /// Message tags left out of echo logging.
    pub hidden_message_types: Vec<String>,
    /// Default wait for a reply. `None` waits forever.
    pub request_timeout_ms: Option<u64>,
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            handshake_version: DEFAULT_HANDSHAKE_VERSION.to_string(),
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
            echo: true,
            hidden_message_types: Vec::new(),
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl CommsConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_address(&self.address)?;

        if self.handshake_version.trim().is_empty() {
            return Err(ConfigError::InvalidHandshakeVersion);
        }

        if self.receive_buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize(self.receive_buffer_size));
        }

        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Default reply timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Whether a message with this tag should be echoed.
    #[must_use]
    pub fn echoes(&self, tag: &str) -> bool {
        self.echo
            && !self
                .hidden_message_types
                .iter()
                .any(|hidden| hidden.eq_ignore_ascii_case(tag))
    }

    /// Connection arguments pointing at the configured host.
    #[must_use]
    pub fn connection_args(&self) -> ConnectionArgs {
        ConnectionArgs {
            address: self.address.clone(),
            handshake_version: self.handshake_version.clone(),
            session_token: None,
        }
    }
}

/// Per-connection arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionArgs {
    pub address: String,
    pub handshake_version: String,
    /// Token from an earlier session. When present the handshake skips the
    /// token exchange and expects `kConnected`.
    pub session_token: Option<String>,
}

impl Default for ConnectionArgs {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            handshake_version: DEFAULT_HANDSHAKE_VERSION.to_string(),
            session_token: None,
        }
    }
}

impl ConnectionArgs {
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_address(&self.address)?;
        if self.handshake_version.trim().is_empty() {
            return Err(ConfigError::InvalidHandshakeVersion);
        }
        if self
            .session_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            return Err(ConfigError::Invalid("session token is empty".into()));
        }
        Ok(())
    }
}

fn validate_address(address: &str) -> Result<(), ConfigError> {
    let rest = address
        .strip_prefix("ws://")
        .or_else(|| address.strip_prefix("wss://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidAddress(address.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid address {0:?}: expected ws:// or wss:// URL")]
    InvalidAddress(String),
    #[error("handshake version cannot be empty")]
    InvalidHandshakeVersion,
    #[error("invalid receive buffer size: {0}")]
    InvalidBufferSize(usize),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
