//! # Dorico Comms
//!
//! The message correlation engine behind the remote-control client.
//!
//! The host speaks JSON over one WebSocket and never echoes a request id, so
//! replies are attributed purely by arrival order: every request appends an
//! entry to a FIFO queue and the receive loop completes the head.
//!
//! ## Layout
//!
//! ```text
//!   caller ──send()──► CommsContext ──FrameSink──► host
//!                         │   ▲
//!            PendingEntry │   │ Reply (oneshot)
//!                         ▼   │
//!                   CorrelationQueue ◄── receive loop ◄──FrameSource── host
//!                                            │
//!                            StatusCache ◄───┤
//!                                            ▼
//!                                     EventPublisher (dorico-bus)
//! ```
//!
//! - **Ports** (`ports/`): transport traits the engine is written against
//! - **Adapters** (`adapters/`): `tokio-tungstenite` and in-memory transports
//! - **Domain** (`domain/`): queue, status cache, replies, connection state
//! - **Context** (`context.rs`): the engine itself

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::memory::{MemoryConnector, MemoryHost};
pub use adapters::websocket::WebSocketConnector;
pub use config::{CommsConfig, ConfigError, ConnectionArgs};
pub use context::CommsContext;
pub use domain::{AbortReason, ConnectionState, CorrelationQueue, QueueStats, Reply, StatusCache};
pub use error::{CommsError, TransportError};
pub use ports::{Connector, FrameKind, FrameSink, FrameSource, ReceivedFrame};
pub use tokio_util::sync::CancellationToken;
