//! The remote-control facade.

use crate::error::RemoteError;
use dorico_bus::{EventFilter, EventStream, InMemoryEventBus, Subscription, TypedSubscription};
use dorico_comms::{
    CommsConfig, CommsContext, Connector, ConnectionArgs, ConnectionState, Reply,
    WebSocketConnector,
};
use dorico_types::commands::Command;
use dorico_types::enums::{FlowIds, LayoutIds};
use dorico_types::note::Note;
use dorico_types::requests::{
    AcceptSessionTokenRequest, ConnectRequest, ConnectWithSessionRequest, GetAppInfoRequest,
    GetCommandsRequest, GetFlowsRequest, GetLayoutsRequest, GetLibraryCollectionsRequest,
    GetLibraryEntitiesRequest, GetOptionsRequest, GetPlaybackTechniquesRequest,
    GetPropertiesRequest, GetStatusRequest, OptionValue, OptionsTarget, Request, Scope,
    SetOptionsRequest,
};
use dorico_types::responses::{
    CodeResponse, CommandCollection, CommandInfo, Envelope, FlowsListResponse, LayoutsListResponse,
    LibraryCollectionsListResponse, LibraryEntitiesListResponse, OptionCollection,
    PlaybackTechniquesListResponse, PropertiesListResponse, Response, ResponseKind, ScoreChanged,
    StatusResponse, VersionResponse, CONNECTED_CODE,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

/// Pull the expected variant out of a response.
macro_rules! expect_response {
    ($request:expr, $response:expr, $variant:ident) => {
        match $response {
            Response::$variant(inner) => Ok(inner),
            other => Err(RemoteError::UnexpectedResponse {
                tag: $request.message_id(),
                expected: ResponseKind::$variant,
                actual: other.kind(),
            }),
        }
    };
}

#[derive(Debug, Default)]
struct Session {
    client_name: Option<String>,
    token: Option<String>,
}

/// Client for one Dorico instance.
pub struct DoricoRemote {
    comms: CommsContext,
    bus: Arc<InMemoryEventBus>,
    timeout: RwLock<Option<Duration>>,
    session: Mutex<Session>,
    commands: Mutex<Option<CommandCollection>>,
    /// Parent of every request's cancellation token.
    cancel: Mutex<CancellationToken>,
}

impl DoricoRemote {
    /// A client that talks to Dorico over WebSocket.
    pub fn new(config: CommsConfig) -> Result<Self, RemoteError> {
        Self::with_connector(Arc::new(WebSocketConnector::new()), config)
    }

    /// A client over any transport.
    pub fn with_connector(
        connector: Arc<dyn Connector>,
        config: CommsConfig,
    ) -> Result<Self, RemoteError> {
        let bus = Arc::new(InMemoryEventBus::new());
        let timeout = config.request_timeout();
        let comms = CommsContext::new(connector, bus.clone(), config)?;

        Ok(Self {
            comms,
            bus,
            timeout: RwLock::new(timeout),
            session: Mutex::new(Session::default()),
            commands: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
        })
    }

    // =========================================================================
    // SETTINGS
    // =========================================================================

    /// How long each request waits for its reply. `None` waits forever.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.read()
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.write() = timeout;
    }

    #[must_use]
    pub fn client_name(&self) -> Option<String> {
        self.session.lock().client_name.clone()
    }

    /// Token of the current session. Pass it back through
    /// [`ConnectionArgs::session_token`] to reconnect without the host
    /// asking the user again.
    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        self.session.lock().token.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.comms.state() == ConnectionState::Open
    }

    /// Abort every request currently waiting for a reply.
    pub fn cancel_pending(&self) {
        let mut cancel = self.cancel.lock();
        cancel.cancel();
        *cancel = CancellationToken::new();
    }

    fn request_token(&self) -> CancellationToken {
        self.cancel.lock().child_token()
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    /// Open the connection and run the handshake.
    ///
    /// Without a session token the host issues one (usually after asking the
    /// user) and the client accepts it. With a token the host must answer
    /// `kConnected`. Connecting while already connected is a no-op.
    pub async fn connect(&self, client_name: &str, args: &ConnectionArgs) -> Result<(), RemoteError> {
        if client_name.trim().is_empty() {
            return Err(RemoteError::InvalidArgument("client name is empty".into()));
        }
        self.session.lock().client_name = Some(client_name.to_string());

        if self.is_connected() {
            return Ok(());
        }

        let cancel = self.request_token();
        if let Err(e) = self.comms.connect(args, &cancel).await {
            error!(error = %e, "Could not connect to Dorico. Make sure Dorico is running");
            return Err(e.into());
        }

        let handshake = match &args.session_token {
            None => self.handshake_new(client_name, args, &cancel).await,
            Some(token) => self
                .handshake_resume(client_name, token, args, &cancel)
                .await
                .map(|()| token.clone()),
        };

        match handshake {
            Ok(token) => {
                self.session.lock().token = Some(token);
                // A new session may be a different Dorico with other commands.
                *self.commands.lock() = None;
                info!(client = %client_name, "Connected to Dorico");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Dorico handshake failed");
                self.comms.shutdown().await;
                Err(e)
            }
        }
    }

    async fn handshake_new(
        &self,
        client_name: &str,
        args: &ConnectionArgs,
        cancel: &CancellationToken,
    ) -> Result<String, RemoteError> {
        let connect =
            ConnectRequest::new(client_name).with_handshake_version(args.handshake_version.clone());
        let response = self.exchange_with(&connect, cancel).await?;
        let token = expect_response!(connect, response, SessionToken)?.session_token;
        if token.trim().is_empty() {
            return Err(RemoteError::NoSessionToken);
        }

        let accept = AcceptSessionTokenRequest::new(token.clone());
        self.exchange_with(&accept, cancel).await?;
        Ok(token)
    }

    async fn handshake_resume(
        &self,
        client_name: &str,
        token: &str,
        args: &ConnectionArgs,
        cancel: &CancellationToken,
    ) -> Result<(), RemoteError> {
        let connect = ConnectWithSessionRequest::new(client_name, token)
            .with_handshake_version(args.handshake_version.clone());
        let response = self.exchange_with(&connect, cancel).await?;
        let code = expect_response!(connect, response, Code)?;
        if code.code != CONNECTED_CODE {
            return Err(RemoteError::SessionRejected { code: code.code });
        }
        Ok(())
    }

    /// Ask Dorico to end the session and wait for it to close.
    pub async fn disconnect(&self) -> Result<(), RemoteError> {
        self.assert_connected()?;
        let cancel = self.request_token();
        self.comms.stop(&cancel, self.timeout()).await?;
        info!("Disconnected from Dorico");
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn get_app_info(&self) -> Result<VersionResponse, RemoteError> {
        let request = GetAppInfoRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, Version)
    }

    /// Every command Dorico knows. Cached after the first non-empty answer.
    pub async fn get_commands(&self) -> Result<CommandCollection, RemoteError> {
        if let Some(commands) = self.commands.lock().as_ref().filter(|c| !c.is_empty()) {
            return Ok(commands.clone());
        }

        let request = GetCommandsRequest;
        let response = self.exchange(&request).await?;
        let commands = expect_response!(request, response, CommandList)?.commands;
        *self.commands.lock() = Some(commands.clone());
        Ok(commands)
    }

    pub async fn get_command(&self, name: &str) -> Result<CommandInfo, RemoteError> {
        let commands = self.get_commands().await?;
        commands
            .get(name)
            .cloned()
            .ok_or_else(|| RemoteError::CommandNotFound(name.to_string()))
    }

    pub async fn get_engraving_options(&self) -> Result<OptionCollection, RemoteError> {
        self.get_options(OptionsTarget::Engraving).await
    }

    pub async fn get_layout_options(&self, layout_id: i64) -> Result<OptionCollection, RemoteError> {
        self.get_options(OptionsTarget::Layout(layout_id)).await
    }

    pub async fn get_notation_options(&self, flow_id: i64) -> Result<OptionCollection, RemoteError> {
        self.get_options(OptionsTarget::Notation(flow_id)).await
    }

    async fn get_options(&self, target: OptionsTarget) -> Result<OptionCollection, RemoteError> {
        let request = GetOptionsRequest::new(target);
        let response = self.exchange(&request).await?;
        Ok(expect_response!(request, response, OptionsList)?.options)
    }

    pub async fn get_flows(&self) -> Result<FlowsListResponse, RemoteError> {
        let request = GetFlowsRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, FlowsList)
    }

    pub async fn get_layouts(&self) -> Result<LayoutsListResponse, RemoteError> {
        let request = GetLayoutsRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, LayoutsList)
    }

    pub async fn get_library_collections(
        &self,
    ) -> Result<LibraryCollectionsListResponse, RemoteError> {
        let request = GetLibraryCollectionsRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, LibraryCollectionsList)
    }

    pub async fn get_library_entities(
        &self,
        collection: &str,
    ) -> Result<LibraryEntitiesListResponse, RemoteError> {
        let request = GetLibraryEntitiesRequest::new(collection);
        let response = self.exchange(&request).await?;
        expect_response!(request, response, LibraryEntitiesList)
    }

    pub async fn get_playback_techniques(
        &self,
    ) -> Result<PlaybackTechniquesListResponse, RemoteError> {
        let request = GetPlaybackTechniquesRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, PlaybackTechniquesList)
    }

    pub async fn get_properties(&self) -> Result<PropertiesListResponse, RemoteError> {
        let request = GetPropertiesRequest;
        let response = self.exchange(&request).await?;
        expect_response!(request, response, PropertiesList)
    }

    /// Fetch a full status snapshot.
    pub async fn get_status(&self) -> Result<StatusResponse, RemoteError> {
        let request = GetStatusRequest;
        let response = self.exchange(&request).await?;
        let status = *expect_response!(request, response, Status)?;
        trace!(status = ?status, "Status");
        Ok(status)
    }

    /// Last status Dorico pushed or returned, without a round trip.
    #[must_use]
    pub fn current_status(&self) -> Option<StatusResponse> {
        self.comms.current_status()
    }

    // =========================================================================
    // OPTIONS
    // =========================================================================

    pub async fn set_engraving_options(
        &self,
        values: Vec<OptionValue>,
    ) -> Result<CodeResponse, RemoteError> {
        self.set_options(SetOptionsRequest::engraving(values)).await
    }

    /// Set layout options on explicit layout ids or a layout group.
    pub async fn set_layout_options(
        &self,
        values: Vec<OptionValue>,
        layouts: Scope<LayoutIds>,
    ) -> Result<CodeResponse, RemoteError> {
        self.set_options(SetOptionsRequest::layout(values, layouts))
            .await
    }

    pub async fn set_notation_options(
        &self,
        values: Vec<OptionValue>,
        flows: Scope<FlowIds>,
    ) -> Result<CodeResponse, RemoteError> {
        self.set_options(SetOptionsRequest::notation(values, flows))
            .await
    }

    async fn set_options(&self, request: SetOptionsRequest) -> Result<CodeResponse, RemoteError> {
        let response = self.exchange(&request).await?;
        expect_response!(request, response, Code)
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub async fn send_command(&self, command: &Command) -> Result<CodeResponse, RemoteError> {
        let response = self.exchange(command).await?;
        expect_response!(command, response, Code)
    }

    /// Enter `note` at the caret, setting its accidental first when it has
    /// one. Note input must already be active.
    pub async fn enter_note(&self, note: &Note) -> Result<(), RemoteError> {
        for command in note.note_commands() {
            self.send_command(&command).await?;
        }
        Ok(())
    }

    /// Send any request and return its reply, decoded and as Dorico sent it.
    pub async fn send_request(&self, request: &dyn Request) -> Result<Envelope, RemoteError> {
        let cancel = self.request_token();
        self.roundtrip(request, &cancel).await
    }

    /// Like [`send_request`](Self::send_request) with a caller-owned
    /// cancellation token.
    pub async fn send_request_with(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
    ) -> Result<Envelope, RemoteError> {
        self.roundtrip(request, cancel).await
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Receive pushed notifications matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.bus.event_stream(filter)
    }

    /// Merged status, delivered after every status push or reply.
    #[must_use]
    pub fn subscribe_status(&self) -> TypedSubscription<StatusResponse> {
        self.bus.subscribe_status()
    }

    #[must_use]
    pub fn subscribe_selection(&self) -> TypedSubscription<ScoreChanged> {
        self.bus.subscribe_selection()
    }

    // =========================================================================
    // PLUMBING
    // =========================================================================

    fn assert_connected(&self) -> Result<(), RemoteError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(RemoteError::NotConnected)
        }
    }

    async fn exchange(&self, request: &dyn Request) -> Result<Response, RemoteError> {
        let cancel = self.request_token();
        self.exchange_with(request, &cancel).await
    }

    async fn exchange_with(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
    ) -> Result<Response, RemoteError> {
        self.roundtrip(request, cancel)
            .await
            .map(Envelope::into_response)
    }

    async fn roundtrip(
        &self,
        request: &dyn Request,
        cancel: &CancellationToken,
    ) -> Result<Envelope, RemoteError> {
        self.assert_connected()?;
        let reply = self.comms.send(request, cancel, self.timeout()).await?;
        check_reply(request.message_id(), reply)
    }
}

fn check_reply(tag: &'static str, reply: Reply) -> Result<Envelope, RemoteError> {
    match reply {
        Reply::Response(envelope) => Ok(envelope),
        Reply::Error(code) => Err(RemoteError::Protocol {
            tag,
            code: code.code,
            detail: code.detail,
        }),
        Reply::Aborted(reason) => Err(RemoteError::Aborted { tag, reason }),
    }
}
