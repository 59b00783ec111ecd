//! Correlation Queue - FIFO bridge between senders and the receive loop.
//!
//! The host never echoes a request id, so a reply belongs to whichever
//! live request has waited longest. Flow:
//! 1. `send` calls `enqueue()` under the writer lock, then writes the request
//! 2. The caller awaits `PendingHandle::wait`
//! 3. The receive loop calls `attribute()` for every decoded response
//! 4. On teardown `drain()` wakes everything still queued
//!
//! Entries are only ever removed from the head. A caller that gives up only
//! marks its entry; the next response flushes it.

use crate::domain::reply::{AbortReason, Reply};
use dorico_types::responses::{Envelope, ResponseKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LIVE: u8 = 0;
const CANCELED: u8 = 1;
const TIMED_OUT: u8 = 2;
const SEND_FAILED: u8 = 3;
const DISCONNECTED: u8 = 4;

/// Canceled / timed-out marker shared between a waiter and its entry.
#[derive(Debug, Default)]
struct AbortFlag(AtomicU8);

impl AbortFlag {
    fn mark(&self, reason: AbortReason) {
        let value = match reason {
            AbortReason::Canceled => CANCELED,
            AbortReason::TimedOut => TIMED_OUT,
            AbortReason::SendFailed => SEND_FAILED,
            AbortReason::Disconnected => DISCONNECTED,
        };
        // First reason wins.
        let _ = self
            .0
            .compare_exchange(LIVE, value, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst) != LIVE
    }
}

struct PendingEntry {
    tag: &'static str,
    kind: ResponseKind,
    flag: Arc<AbortFlag>,
    completion: oneshot::Sender<Reply>,
    enqueued_at: Instant,
}

/// What `attribute` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// Completed the head with the response.
    Completed { tag: &'static str },
    /// Completed the head with a `kError` reply.
    Errored { tag: &'static str },
    /// No live request was waiting for this response.
    Unmatched,
}

/// Queue counters.
#[derive(Debug, Default)]
pub struct QueueStats {
    pub total_enqueued: AtomicU64,
    pub total_completed: AtomicU64,
    /// Heads completed with `kError`.
    pub total_errors: AtomicU64,
    /// Abandoned entries flushed from the head.
    pub total_flushed: AtomicU64,
    /// Entries woken by a disconnect.
    pub total_drained: AtomicU64,
}

/// Waiter side of one queued request.
pub struct PendingHandle {
    tag: &'static str,
    receiver: oneshot::Receiver<Reply>,
    flag: Arc<AbortFlag>,
}

impl PendingHandle {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Mark the entry abandoned without waiting.
    pub fn abort(&self, reason: AbortReason) {
        self.flag.mark(reason);
    }

    /// Wait for the reply, the cancellation token or the timeout, whichever
    /// comes first. `None` waits forever.
    pub async fn wait(mut self, cancel: &CancellationToken, timeout: Option<Duration>) -> Reply {
        let expired = async move {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            reply = &mut self.receiver => {
                reply.unwrap_or(Reply::Aborted(AbortReason::Disconnected))
            }
            () = cancel.cancelled() => self.abandon(AbortReason::Canceled),
            () = expired => self.abandon(AbortReason::TimedOut),
        }
    }

    fn abandon(&mut self, reason: AbortReason) -> Reply {
        self.flag.mark(reason);
        info!(tag = self.tag, reason = %reason, "Request abandoned");
        // The loop may have completed the entry just before the flag landed.
        match self.receiver.try_recv() {
            Ok(reply) => reply,
            Err(_) => Reply::Aborted(reason),
        }
    }
}

/// Thread-safe FIFO of outstanding requests.
#[derive(Default)]
pub struct CorrelationQueue {
    entries: Mutex<VecDeque<PendingEntry>>,
    stats: QueueStats,
}

impl CorrelationQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for a request about to be written.
    pub fn enqueue(&self, tag: &'static str, kind: ResponseKind) -> PendingHandle {
        let (completion, receiver) = oneshot::channel();
        let flag = Arc::new(AbortFlag::default());
        self.entries.lock().push_back(PendingEntry {
            tag,
            kind,
            flag: flag.clone(),
            completion,
            enqueued_at: Instant::now(),
        });
        self.stats.total_enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(tag = tag, kind = %kind, "Enqueued pending request");
        PendingHandle {
            tag,
            receiver,
            flag,
        }
    }

    /// Offer a decoded response to the head of the queue.
    ///
    /// Abandoned heads are flushed first. A `kError` response completes the
    /// head whatever it was waiting for; anything else completes it only when
    /// the kinds match.
    pub fn attribute(&self, envelope: &Envelope) -> Attribution {
        let mut entries = self.entries.lock();
        loop {
            let Some(head) = entries.front() else {
                return Attribution::Unmatched;
            };

            if head.flag.is_aborted() {
                if let Some(entry) = entries.pop_front() {
                    self.stats.total_flushed.fetch_add(1, Ordering::Relaxed);
                    debug!(tag = entry.tag, "Flushed abandoned request");
                }
                continue;
            }

            if let Some(error) = envelope.response.as_error() {
                let Some(entry) = entries.pop_front() else {
                    return Attribution::Unmatched;
                };
                self.stats.total_errors.fetch_add(1, Ordering::Relaxed);
                let tag = entry.tag;
                Self::complete(entry, Reply::Error(error.clone()));
                return Attribution::Errored { tag };
            }

            if head.kind != envelope.kind() {
                return Attribution::Unmatched;
            }

            let Some(entry) = entries.pop_front() else {
                return Attribution::Unmatched;
            };
            self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
            let tag = entry.tag;
            Self::complete(entry, Reply::Response(envelope.clone()));
            return Attribution::Completed { tag };
        }
    }

    fn complete(entry: PendingEntry, reply: Reply) {
        let elapsed = entry.enqueued_at.elapsed();
        if entry.completion.send(reply).is_err() {
            // The waiter gave up after the entry was popped. The reply was
            // still its own, so nothing behind it shifts.
            info!(tag = entry.tag, "Reply arrived after its request was abandoned");
        } else {
            debug!(
                tag = entry.tag,
                response_time_ms = elapsed.as_millis(),
                "Completed pending request"
            );
        }
    }

    /// Whether the oldest live request is waiting for `kind`.
    #[must_use]
    pub fn live_head_awaits(&self, kind: ResponseKind) -> bool {
        self.entries
            .lock()
            .iter()
            .find(|entry| !entry.flag.is_aborted())
            .is_some_and(|entry| entry.kind == kind)
    }

    /// Remove every entry, waking each with `Reply::Aborted(reason)`.
    ///
    /// Each completion sender is consumed here, so no waiter is woken twice.
    /// Returns the number of waiters that were still listening.
    pub fn drain(&self, reason: AbortReason) -> usize {
        let drained: Vec<PendingEntry> = self.entries.lock().drain(..).collect();
        self.stats
            .total_drained
            .fetch_add(drained.len() as u64, Ordering::Relaxed);

        let mut woken = 0;
        for entry in drained {
            entry.flag.mark(reason);
            if entry.completion.send(Reply::Aborted(reason)).is_ok() {
                woken += 1;
            }
        }
        woken
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
