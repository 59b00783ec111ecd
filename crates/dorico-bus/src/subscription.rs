//! Receiving side of the bus: filtered subscriptions, a `Stream` adapter
//! and subscriptions unwrapped to a single payload shape.

use crate::bus::BusStats;
use crate::events::{EventFilter, RemoteEvent};
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped and every buffered event has been read.
    #[error("event bus closed")]
    Closed,
}

fn record_lag(stats: &BusStats, skipped: u64) {
    stats.lagged.fetch_add(skipped, Ordering::Relaxed);
    warn!(skipped = skipped, "Subscriber fell behind, oldest events lost");
}

/// Events accepted by a filter. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<RemoteEvent>,
    filter: EventFilter,
    stats: Arc<BusStats>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<RemoteEvent>,
        filter: EventFilter,
        stats: Arc<BusStats>,
    ) -> Self {
        Self { receiver, filter, stats }
    }

    /// Wait for the next accepted event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<RemoteEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => record_lag(&self.stats, skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next accepted event already buffered, if any.
    pub fn try_recv(&mut self) -> Result<Option<RemoteEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => record_lag(&self.stats, skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

/// A [`Subscription`] as a `Stream`, for `select!` loops and combinators.
pub struct EventStream {
    inner: BroadcastStream<RemoteEvent>,
    filter: EventFilter,
    stats: Arc<BusStats>,
}

impl EventStream {
    pub(crate) fn new(
        receiver: broadcast::Receiver<RemoteEvent>,
        filter: EventFilter,
        stats: Arc<BusStats>,
    ) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            stats,
        }
    }

    #[must_use]
    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = RemoteEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RemoteEvent>> {
        loop {
            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(event)) if self.filter.matches(&event) => return Poll::Ready(Some(event)),
                Some(Ok(_)) => {}
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    record_lag(&self.stats, skipped);
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

/// One topic, delivered as its payload rather than as a [`RemoteEvent`].
pub struct TypedSubscription<T> {
    inner: Subscription,
    pick: fn(RemoteEvent) -> Option<T>,
}

impl<T> TypedSubscription<T> {
    pub(crate) fn new(inner: Subscription, pick: fn(RemoteEvent) -> Option<T>) -> Self {
        Self { inner, pick }
    }

    /// Keep only payloads about these open scores.
    #[must_use]
    pub fn for_scores(mut self, open_score_ids: Vec<i64>) -> Self {
        self.inner.filter.open_score_ids = open_score_ids;
        self
    }

    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let event = self.inner.recv().await?;
            if let Some(payload) = (self.pick)(event) {
                return Some(payload);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Option<T>, SubscriptionError> {
        while let Some(event) = self.inner.try_recv()? {
            if let Some(payload) = (self.pick)(event) {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }
}
