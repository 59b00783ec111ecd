//! # Dorico Bus - Notifications From the Host
//!
//! The host pushes status patches, selection changes and similar messages
//! at any time. The correlation engine publishes each of them here; UI code
//! and scripts subscribe instead of polling.
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐  subscribe()  ┌────────────┐
//! │ CommsContext │ ─────────────▶ │  Event Bus   │ ────────────▶ │ Subscriber │
//! │ receive loop │                │  (broadcast) │               │            │
//! └──────────────┘                └──────────────┘               └────────────┘
//! ```
//!
//! Subscribers that fall behind lose the oldest events rather than
//! blocking the receive loop. Callers interested in one kind of push can
//! take a [`TypedSubscription`] that yields the payload directly.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bus;
pub mod events;
pub mod subscription;

pub use bus::{EventPublisher, InMemoryEventBus};
pub use events::{EventFilter, EventTopic, RemoteEvent};
pub use subscription::{EventStream, Subscription, SubscriptionError, TypedSubscription};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
