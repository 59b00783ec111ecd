//! WebSocket transport over `tokio-tungstenite`.
//!
//! Tungstenite hands over whole messages; the source re-slices them into
//! buffer-sized fragments so the engine sees the same framing a streaming
//! socket would give it. Ping/pong is answered by tungstenite and never
//! surfaces here.

use crate::error::TransportError;
use crate::ports::transport::FragmentCursor;
use crate::ports::{Connector, FrameKind, FrameSink, FrameSource, ReceivedFrame, TransportPair};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://` connections to the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, address: &str) -> Result<TransportPair, TransportError> {
        let (stream, _response) =
            connect_async(address)
                .await
                .map_err(|e| TransportError::Connect {
                    address: address.to_string(),
                    reason: e.to_string(),
                })?;
        info!(address = %address, "WebSocket connected");

        let (sink, stream) = stream.split();
        Ok((
            Box::new(WebSocketSink { sink }),
            Box::new(WebSocketSource {
                stream,
                pending: None,
            }),
        ))
    }
}

/// Write half.
pub struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        };
        match self.sink.send(Message::Close(Some(frame))).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}

/// Read half.
pub struct WebSocketSource {
    stream: SplitStream<WsStream>,
    pending: Option<FragmentCursor>,
}

impl WebSocketSource {
    fn drain_pending(&mut self, buf: &mut [u8]) -> Option<ReceivedFrame> {
        let cursor = self.pending.as_mut()?;
        let (frame, done) = cursor.next_fragment(buf);
        if done {
            self.pending = None;
        }
        Some(frame)
    }
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn receive(&mut self, buf: &mut [u8]) -> Result<ReceivedFrame, TransportError> {
        if let Some(frame) = self.drain_pending(buf) {
            return Ok(frame);
        }

        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Err(TransportError::ConnectionLost)
                }
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            };

            let (payload, kind) = match message {
                Message::Text(text) => (text.as_str().as_bytes().to_vec(), FrameKind::Text),
                Message::Binary(bytes) => (bytes.to_vec(), FrameKind::Binary),
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (
                            Some(u16::from(frame.code)),
                            Some(frame.reason.as_str().to_string()).filter(|r| !r.is_empty()),
                        ),
                        None => (None, None),
                    };
                    debug!(code = ?code, reason = ?reason, "Close frame received");
                    return Ok(ReceivedFrame::close(code, reason));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            self.pending = Some(FragmentCursor::new(payload, kind));
            if let Some(frame) = self.drain_pending(buf) {
                return Ok(frame);
            }
        }
    }
}
