//! # Dorico Remote
//!
//! Typed client for the Dorico remote-control API.
//!
//! ```ignore
//! use dorico_remote::{CommsConfig, DoricoRemote};
//!
//! let config = CommsConfig::default();
//! let remote = DoricoRemote::new(config.clone())?;
//! remote.connect("My Client", &config.connection_args()).await?;
//!
//! let version = remote.get_app_info().await?;
//! let flows = remote.get_flows().await?;
//!
//! remote.disconnect().await?;
//! ```
//!
//! Every operation is one request/reply exchange through
//! [`dorico_comms::CommsContext`]; pushed notifications are delivered through
//! [`DoricoRemote::subscribe`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod remote;

pub use dorico_bus::{
    EventFilter, EventStream, EventTopic, RemoteEvent, Subscription, TypedSubscription,
};
pub use dorico_comms::{CancellationToken, CommsConfig, ConnectionArgs};
pub use error::RemoteError;
pub use remote::DoricoRemote;
