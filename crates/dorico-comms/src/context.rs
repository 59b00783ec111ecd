//! # Comms Context
//!
//! The correlation engine. One `CommsContext` owns one connection at a time
//! and exactly one receive loop for it.
//!
//! Senders take the writer lock, append a pending entry and write the request
//! while still holding it, so queue order always equals wire order. The
//! receive loop never takes the writer lock except during teardown.

use crate::config::{CommsConfig, ConnectionArgs};
use crate::domain::{
    AbortReason, Attribution, ConnectionState, CorrelationQueue, QueueStats, Reply, StatusCache,
};
use crate::error::{CommsError, TransportError};
use crate::ports::{Connector, FrameKind, FrameSink, FrameSource};
use dorico_bus::{EventPublisher, RemoteEvent};
use dorico_types::requests::{DisconnectRequest, Request};
use dorico_types::responses::{Envelope, Response, ResponseKind, StatusResponse};
use dorico_types::{parse_envelope, TypeRegistry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// State shared between callers and the receive loop.
struct Shared {
    config: CommsConfig,
    registry: TypeRegistry,
    queue: CorrelationQueue,
    status: Mutex<StatusCache>,
    state: Mutex<ConnectionState>,
    /// Write half; `None` while disconnected.
    writer: tokio::sync::Mutex<Option<Box<dyn FrameSink>>>,
    publisher: Arc<dyn EventPublisher>,
    running: AtomicBool,
    /// Set by the first teardown of a connection, cleared on connect.
    torn_down: AtomicBool,
    shutdown: Mutex<CancellationToken>,
}

/// Client-side correlation engine for one host connection.
pub struct CommsContext {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    receive_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl CommsContext {
    /// Create an engine that opens connections through `connector` and
    /// publishes unprompted messages to `publisher`.
    pub fn new(
        connector: Arc<dyn Connector>,
        publisher: Arc<dyn EventPublisher>,
        config: CommsConfig,
    ) -> Result<Self, CommsError> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                registry: TypeRegistry::standard(),
                queue: CorrelationQueue::new(),
                status: Mutex::new(StatusCache::new()),
                state: Mutex::new(ConnectionState::Disconnected),
                writer: tokio::sync::Mutex::new(None),
                publisher,
                running: AtomicBool::new(false),
                torn_down: AtomicBool::new(true),
                shutdown: Mutex::new(CancellationToken::new()),
            }),
            connector,
            receive_task: tokio::sync::Mutex::new(None),
        })
    }

    /// Open the transport and start the receive loop.
    pub async fn connect(
        &self,
        args: &ConnectionArgs,
        cancel: &CancellationToken,
    ) -> Result<(), CommsError> {
        args.validate()?;

        {
            let mut state = self.shared.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(CommsError::AlreadyConnected);
            }
            *state = ConnectionState::Connecting;
        }

        // The loop of a previous connection may still be returning.
        if let Some(previous) = self.receive_task.lock().await.take() {
            if let Err(e) = previous.await {
                warn!(error = %e, "Previous receive loop ended abnormally");
            }
        }

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = self.connector.connect(&args.address) => Some(result),
        };

        let (sink, source) = match opened {
            Some(Ok(pair)) => pair,
            Some(Err(e)) => {
                *self.shared.state.lock() = ConnectionState::Disconnected;
                warn!(address = %args.address, error = %e, "Connection failed");
                return Err(CommsError::ConnectFailed(e));
            }
            None => {
                *self.shared.state.lock() = ConnectionState::Disconnected;
                info!(address = %args.address, "Connect canceled");
                return Err(CommsError::RequestAborted(AbortReason::Canceled));
            }
        };

        self.shared.queue.drain(AbortReason::Disconnected);
        self.shared.status.lock().reset();
        *self.shared.writer.lock().await = Some(sink);

        let shutdown = CancellationToken::new();
        *self.shared.shutdown.lock() = shutdown.clone();
        self.shared.torn_down.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);
        *self.shared.state.lock() = ConnectionState::Open;

        info!(address = %args.address, "Connection opened");

        let handle = tokio::spawn(receive_loop(Arc::clone(&self.shared), source, shutdown));
        *self.receive_task.lock().await = Some(handle);
        Ok(())
    }

    /// Write `request` and wait for its reply.
    ///
    /// Fails with `NotConnected`, before anything is written, when the
    /// connection is not open. Every other outcome is a [`Reply`]. `None`
    /// as the timeout waits until a reply, cancellation or disconnect.
    pub async fn send(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<Reply, CommsError> {
        let handle = {
            let mut writer = self.shared.writer.lock().await;
            if !self.state().accepts_requests() {
                return Err(CommsError::NotConnected);
            }
            let Some(sink) = writer.as_mut() else {
                return Err(CommsError::NotConnected);
            };

            let tag = request.message_id();
            let text = request.message();
            let handle = self.shared.queue.enqueue(tag, request.response_kind());

            if let Err(e) = sink.send_text(&text).await {
                handle.abort(AbortReason::SendFailed);
                warn!(tag = tag, error = %e, "Failed to send request");
                return Ok(Reply::Aborted(AbortReason::SendFailed));
            }

            if self.shared.config.echoes(tag) {
                debug!(tag = tag, message = %text, "Sent");
            }
            handle
        };

        Ok(handle.wait(cancel, timeout).await)
    }

    /// Send `disconnect`, wait for the host to close, then join the receive
    /// loop.
    ///
    /// A disconnect wait that was canceled or timed out fails with
    /// `RequestAborted` and leaves the connection as it was.
    pub async fn stop(
        &self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Result<(), CommsError> {
        match self.send(&DisconnectRequest, cancel, timeout).await? {
            Reply::Aborted(reason @ (AbortReason::Canceled | AbortReason::TimedOut)) => {
                warn!(reason = %reason, "Disconnect was not acknowledged");
                return Err(CommsError::RequestAborted(reason));
            }
            reply => debug!(reply = ?reply, "Disconnect acknowledged"),
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the receive loop without the disconnect exchange and wait for it.
    pub async fn shutdown(&self) {
        self.shared.shutdown.lock().cancel();
        if let Some(handle) = self.receive_task.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Receive loop ended abnormally");
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// True while the receive loop is serving a connection.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Last status pushed or fetched on this connection.
    #[must_use]
    pub fn current_status(&self) -> Option<StatusResponse> {
        self.shared.status.lock().current().cloned()
    }

    /// Requests written but not yet attributed or flushed.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared.queue.len()
    }

    #[must_use]
    pub fn queue_stats(&self) -> &QueueStats {
        self.shared.queue.stats()
    }

    #[must_use]
    pub fn config(&self) -> &CommsConfig {
        &self.shared.config
    }
}

impl Drop for CommsContext {
    fn drop(&mut self) {
        self.shared.shutdown.lock().cancel();
    }
}

// =============================================================================
// RECEIVE LOOP
// =============================================================================

async fn receive_loop(
    shared: Arc<Shared>,
    mut source: Box<dyn FrameSource>,
    shutdown: CancellationToken,
) {
    let mut buffer = vec![0u8; shared.config.receive_buffer_size];
    let mut message: Vec<u8> = Vec::new();

    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                shared.teardown(None, Some("client shutdown".into()), true).await;
                break;
            }
            frame = source.receive(&mut buffer) => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Transport read failed, treating as connection loss");
                let reason = match e {
                    TransportError::ConnectionLost => None,
                    other => Some(other.to_string()),
                };
                shared.teardown(None, reason, false).await;
                break;
            }
        };

        if let FrameKind::Close { code, reason } = frame.kind {
            shared.teardown(code, reason, false).await;
            break;
        }

        let count = frame.count.min(buffer.len());
        message.extend_from_slice(&buffer[..count]);
        if !frame.end_of_message {
            continue;
        }

        let bytes = std::mem::take(&mut message);
        if bytes.is_empty() {
            continue;
        }
        match String::from_utf8(bytes) {
            Ok(text) => shared.dispatch(&text).await,
            Err(e) => error!(error = %e, "Discarding message that is not UTF-8"),
        }
    }

    debug!("Receive loop exited");
}

impl Shared {
    /// Classify and decode one complete message, then route it.
    async fn dispatch(&self, text: &str) {
        let (tag, value) = match parse_envelope(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, content = %text, "Unknown response received");
                return;
            }
        };

        let Some(registration) = self.registry.lookup(&tag) else {
            error!(tag = %tag, content = %text, "Unknown response received");
            return;
        };

        let decoded = if registration.kind == ResponseKind::Status {
            let mut cache = self.status.lock();
            let result = if self.queue.live_head_awaits(ResponseKind::Status) {
                cache.replace(&value)
            } else {
                cache.patch(&value)
            };
            result.map(|status| Response::Status(Box::new(status)))
        } else {
            self.registry.decode(&tag, value)
        };

        let response = match decoded {
            Ok(response) => response,
            Err(e) => {
                error!(tag = %tag, error = %e, "Failed to decode response");
                return;
            }
        };

        if self.config.echoes(&tag) {
            debug!(tag = %tag, message = %text, "Received");
        }

        self.route(Envelope::new(response, text)).await;
    }

    /// Complete the matching request, then publish if unprompted.
    async fn route(&self, envelope: Envelope) {
        let kind = envelope.kind();
        // Visible to a caller woken by this very status reply.
        if let Response::Status(status) = &envelope.response {
            self.status.lock().set_current(status.as_ref().clone());
        }

        match self.queue.attribute(&envelope) {
            Attribution::Completed { tag } => debug!(tag = tag, kind = %kind, "Response attributed"),
            Attribution::Errored { tag } => {
                info!(tag = tag, error = ?envelope.response.as_error(), "Host rejected request");
            }
            Attribution::Unmatched if kind.is_unprompted() => {}
            Attribution::Unmatched => {
                warn!(kind = %kind, "Response matched no pending request");
            }
        }

        if !kind.is_unprompted() {
            return;
        }
        if let Some(event) = RemoteEvent::from_response(&envelope.response) {
            self.publisher.publish(event);
        }
    }

    /// Runs once per connection, whoever gets here first.
    async fn teardown(&self, code: Option<u16>, reason: Option<String>, close_sink: bool) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.lock() = ConnectionState::Closing;

        // Taking the writer waits out any sender mid-write, so nothing can be
        // enqueued after the drain below.
        let sink = self.writer.lock().await.take();
        if let (true, Some(mut sink)) = (close_sink, sink) {
            if let Err(e) = sink.close("client shutdown").await {
                debug!(error = %e, "Close handshake failed");
            }
        }

        let woken = self.queue.drain(AbortReason::Disconnected);
        info!(code = ?code, reason = ?reason, woken = woken, "Connection closed");

        self.publisher.publish(RemoteEvent::Disconnected { code, reason });
        self.running.store(false, Ordering::SeqCst);
        *self.state.lock() = ConnectionState::Disconnected;
    }
}
