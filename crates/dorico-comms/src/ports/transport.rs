//! Transport Ports (Driven Ports)
//!
//! A connection is split into a write half owned by senders and a read
//! half owned by the receive loop. Frames are read into a caller-supplied
//! buffer, so one logical message may take several `receive` calls.

use crate::error::TransportError;
use async_trait::async_trait;

/// Write and read halves of one open connection.
pub type TransportPair = (Box<dyn FrameSink>, Box<dyn FrameSource>);

/// Opens connections to the host.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<TransportPair, TransportError>;
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one complete text message.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Start the close handshake.
    async fn close(&mut self, reason: &str) -> Result<(), TransportError>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Read the next fragment into `buf`.
    ///
    /// `count` bytes of `buf` are valid; `end_of_message` is set on the last
    /// fragment of a message. Close frames carry no payload bytes.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<ReceivedFrame, TransportError>;
}

/// Kind of a received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// Result of one `receive` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub count: usize,
    pub end_of_message: bool,
    pub kind: FrameKind,
}

impl ReceivedFrame {
    #[must_use]
    pub fn close(code: Option<u16>, reason: Option<String>) -> Self {
        Self {
            count: 0,
            end_of_message: true,
            kind: FrameKind::Close { code, reason },
        }
    }
}

/// Copies buffered payload bytes out in `buf`-sized fragments.
///
/// Shared by the adapters: each holds one of these per in-flight message.
#[derive(Debug)]
pub(crate) struct FragmentCursor {
    payload: Vec<u8>,
    offset: usize,
    kind: FrameKind,
}

impl FragmentCursor {
    pub(crate) fn new(payload: Vec<u8>, kind: FrameKind) -> Self {
        Self {
            payload,
            offset: 0,
            kind,
        }
    }

    /// Copy the next fragment. Returns the frame and whether the cursor is
    /// exhausted.
    pub(crate) fn next_fragment(&mut self, buf: &mut [u8]) -> (ReceivedFrame, bool) {
        let remaining = &self.payload[self.offset..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.offset += count;
        let done = self.offset >= self.payload.len();
        (
            ReceivedFrame {
                count,
                end_of_message: done,
                kind: self.kind.clone(),
            },
            done,
        )
    }
}
