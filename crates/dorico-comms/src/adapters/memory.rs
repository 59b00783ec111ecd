//! In-memory transport.
//!
//! `MemoryConnector` hands the engine one end of a pair of channels and the
//! test keeps the other end as a [`MemoryHost`], which plays the part of the
//! Dorico host: it reads what the client sent and scripts what comes back.

use crate::error::TransportError;
use crate::ports::transport::FragmentCursor;
use crate::ports::{Connector, FrameKind, FrameSink, FrameSource, ReceivedFrame, TransportPair};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// A frame scripted by the host.
#[derive(Debug, Clone)]
pub enum HostFrame {
    Text(String),
    Binary(Vec<u8>),
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// The next read fails with this error.
    Error(TransportError),
}

struct ClientEnds {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<HostFrame>,
    flags: Arc<SharedFlags>,
}

#[derive(Default)]
struct SharedFlags {
    fail_sends: AtomicBool,
    close_requested: AtomicBool,
}

/// Connector backed by in-process channels. Each connect attempt takes the
/// next unused host end; once they are used up, connecting is refused.
pub struct MemoryConnector {
    ends: Mutex<VecDeque<ClientEnds>>,
    connects: AtomicUsize,
}

impl MemoryConnector {
    /// A connector serving one connection, and the host end it talks to.
    #[must_use]
    pub fn pair() -> (Self, MemoryHost) {
        let (connector, mut hosts) = Self::sequence(1);
        let host = hosts.remove(0);
        (connector, host)
    }

    /// A connector serving `count` connections in order, one host per
    /// connection.
    #[must_use]
    pub fn sequence(count: usize) -> (Self, Vec<MemoryHost>) {
        let mut ends = VecDeque::with_capacity(count);
        let mut hosts = Vec::with_capacity(count);
        for _ in 0..count {
            let (outgoing, sent) = mpsc::unbounded_channel();
            let (frames, incoming) = mpsc::unbounded_channel();
            let flags = Arc::new(SharedFlags::default());
            ends.push_back(ClientEnds {
                outgoing,
                incoming,
                flags: flags.clone(),
            });
            hosts.push(MemoryHost {
                sent,
                frames,
                flags,
            });
        }
        let connector = Self {
            ends: Mutex::new(ends),
            connects: AtomicUsize::new(0),
        };
        (connector, hosts)
    }

    /// A connector whose every connect attempt fails.
    #[must_use]
    pub fn refusing() -> Self {
        Self::sequence(0).0
    }

    /// Number of connect attempts so far.
    #[must_use]
    pub fn connect_attempts(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, address: &str) -> Result<TransportPair, TransportError> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        let ends = self.ends.lock().pop_front().ok_or_else(|| TransportError::Connect {
            address: address.to_string(),
            reason: "connection refused".into(),
        })?;
        debug!(address = %address, "In-memory transport connected");
        Ok((
            Box::new(MemorySink {
                outgoing: ends.outgoing,
                flags: ends.flags,
            }),
            Box::new(MemorySource {
                incoming: ends.incoming,
                pending: None,
            }),
        ))
    }
}

struct MemorySink {
    outgoing: mpsc::UnboundedSender<String>,
    flags: Arc<SharedFlags>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.flags.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send("scripted send failure".into()));
        }
        self.outgoing
            .send(text.to_string())
            .map_err(|_| TransportError::ConnectionLost)
    }

    async fn close(&mut self, _reason: &str) -> Result<(), TransportError> {
        self.flags.close_requested.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemorySource {
    incoming: mpsc::UnboundedReceiver<HostFrame>,
    pending: Option<FragmentCursor>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<ReceivedFrame, TransportError> {
        if self.pending.is_none() {
            let (payload, kind) = match self.incoming.recv().await {
                None => return Err(TransportError::ConnectionLost),
                Some(HostFrame::Error(e)) => return Err(e),
                Some(HostFrame::Close { code, reason }) => {
                    return Ok(ReceivedFrame::close(code, reason))
                }
                Some(HostFrame::Text(text)) => (text.into_bytes(), FrameKind::Text),
                Some(HostFrame::Binary(bytes)) => (bytes, FrameKind::Binary),
            };
            self.pending = Some(FragmentCursor::new(payload, kind));
        }

        let Some(cursor) = self.pending.as_mut() else {
            return Err(TransportError::ConnectionLost);
        };
        let (frame, done) = cursor.next_fragment(buf);
        if done {
            self.pending = None;
        }
        Ok(frame)
    }
}

/// The scripted host end of a [`MemoryConnector`].
pub struct MemoryHost {
    sent: mpsc::UnboundedReceiver<String>,
    frames: mpsc::UnboundedSender<HostFrame>,
    flags: Arc<SharedFlags>,
}

impl MemoryHost {
    /// Queue a text message for the client. Returns `false` once the client
    /// side has gone away.
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.push(HostFrame::Text(text.into()))
    }

    pub fn push_json(&self, value: &Value) -> bool {
        self.push_text(value.to_string())
    }

    pub fn push_binary(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.push(HostFrame::Binary(bytes.into()))
    }

    pub fn push_close(&self, code: Option<u16>, reason: Option<&str>) -> bool {
        self.push(HostFrame::Close {
            code,
            reason: reason.map(str::to_string),
        })
    }

    /// Make the client's next read fail.
    pub fn push_error(&self, error: TransportError) -> bool {
        self.push(HostFrame::Error(error))
    }

    pub fn push(&self, frame: HostFrame) -> bool {
        self.frames.send(frame).is_ok()
    }

    /// Next message the client sent, waiting for it.
    pub async fn next_sent(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// Next sent message, parsed as JSON.
    pub async fn next_sent_json(&mut self) -> Option<Value> {
        let text = self.next_sent().await?;
        serde_json::from_str(&text).ok()
    }

    /// Next sent message if one is already waiting.
    pub fn try_next_sent(&mut self) -> Option<String> {
        self.sent.try_recv().ok()
    }

    /// Make subsequent client writes fail.
    pub fn fail_sends(&self, fail: bool) {
        self.flags.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Whether the client started a close handshake.
    #[must_use]
    pub fn close_requested(&self) -> bool {
        self.flags.close_requested.load(Ordering::SeqCst)
    }
}
