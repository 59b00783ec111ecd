//! # Broadcast Bus
//!
//! One `broadcast` channel fans every [`RemoteEvent`] out to all
//! subscriptions. Filtering happens on the receiving side, so publishing
//! never looks at who is listening.

use crate::events::{EventFilter, EventTopic, RemoteEvent};
use crate::subscription::{EventStream, Subscription, TypedSubscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use dorico_types::responses::{LibraryChanged, ScoreChanged, StatusResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Where the receive loop hands off unprompted messages.
///
/// Publishing must not block: the loop calls this between frames.
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscriptions the event was offered to.
    fn publish(&self, event: RemoteEvent) -> usize;
}

/// Counters shared between the bus and its subscriptions.
#[derive(Debug, Default)]
pub(crate) struct BusStats {
    pub(crate) published: AtomicU64,
    /// Events a slow subscription never saw.
    pub(crate) lagged: AtomicU64,
}

/// In-process bus backed by `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<RemoteEvent>,
    stats: Arc<BusStats>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is how far a subscription may fall behind before it
    /// starts losing the oldest events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: Arc::new(BusStats::default()),
            capacity,
        }
    }

    /// Receive every event `filter` accepts, from now on.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        trace!(topics = ?filter.topics, scores = ?filter.open_score_ids, "Subscribed");
        Subscription::new(self.sender.subscribe(), filter, Arc::clone(&self.stats))
    }

    /// [`subscribe`](Self::subscribe) as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter, Arc::clone(&self.stats))
    }

    /// Receive one topic, unwrapped into its payload by `pick`.
    #[must_use]
    pub fn subscribe_typed<T>(
        &self,
        topic: EventTopic,
        pick: fn(RemoteEvent) -> Option<T>,
    ) -> TypedSubscription<T> {
        TypedSubscription::new(self.subscribe(EventFilter::topics(vec![topic])), pick)
    }

    /// Merged status after every push or status reply.
    #[must_use]
    pub fn subscribe_status(&self) -> TypedSubscription<StatusResponse> {
        self.subscribe_typed(EventTopic::Status, |event| match event {
            RemoteEvent::Status(status) => Some(*status),
            _ => None,
        })
    }

    #[must_use]
    pub fn subscribe_selection(&self) -> TypedSubscription<ScoreChanged> {
        self.subscribe_typed(EventTopic::Selection, |event| match event {
            RemoteEvent::SelectionChanged(changed) => Some(changed),
            _ => None,
        })
    }

    #[must_use]
    pub fn subscribe_options(&self) -> TypedSubscription<ScoreChanged> {
        self.subscribe_typed(EventTopic::Options, |event| match event {
            RemoteEvent::OptionsChanged(changed) => Some(changed),
            _ => None,
        })
    }

    #[must_use]
    pub fn subscribe_playback(&self) -> TypedSubscription<ScoreChanged> {
        self.subscribe_typed(EventTopic::Playback, |event| match event {
            RemoteEvent::PlaybackConfigurationChanged(changed) => Some(changed),
            _ => None,
        })
    }

    #[must_use]
    pub fn subscribe_library(&self) -> TypedSubscription<LibraryChanged> {
        self.subscribe_typed(EventTopic::Library, |event| match event {
            RemoteEvent::LibraryChanged(changed) => Some(changed),
            _ => None,
        })
    }

    /// Live subscriptions and streams.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.stats.published.load(Ordering::Relaxed)
    }

    /// Events lost across all subscriptions because they fell behind.
    #[must_use]
    pub fn events_lagged(&self) -> u64 {
        self.stats.lagged.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: RemoteEvent) -> usize {
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();
        // An error only means nobody is subscribed yet.
        let offered = self.sender.send(event).unwrap_or(0);
        trace!(topic = ?topic, offered = offered, "Event published");
        offered
    }
}
