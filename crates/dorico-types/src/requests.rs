//! # Requests
//!
//! Every request is a flat JSON object tagged by `message`. A request also
//! declares which response shape answers it; the engine uses that to
//! attribute replies.

use crate::enums::{FlowIds, LayoutIds, OptionsType};
use crate::registry::MESSAGE_FIELD;
use crate::responses::ResponseKind;
use serde_json::{json, Map, Value};
use std::fmt;

/// Handshake version sent on connect when none is configured.
pub const DEFAULT_HANDSHAKE_VERSION: &str = "1.0";

/// A message that can be sent to the host.
pub trait Request: fmt::Debug + Send + Sync {
    /// Wire tag, e.g. `getstatus`.
    fn message_id(&self) -> &'static str;

    /// Shape of the reply the host sends back.
    fn response_kind(&self) -> ResponseKind;

    /// Fields other than the tag.
    fn fields(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Full JSON object, tag included.
    fn to_json(&self) -> Value {
        let mut fields = self.fields();
        fields.insert(MESSAGE_FIELD.to_string(), Value::from(self.message_id()));
        Value::Object(fields)
    }

    /// Serialized text put on the wire.
    fn message(&self) -> String {
        self.to_json().to_string()
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Declares requests that carry nothing but their tag.
macro_rules! bare_request {
    ($(#[$meta:meta])* $name:ident, $tag:literal, $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Request for $name {
            fn message_id(&self) -> &'static str {
                $tag
            }

            fn response_kind(&self) -> ResponseKind {
                ResponseKind::$kind
            }
        }
    };
}

bare_request!(
    /// Asks the host to close the session. Answered by the close frame.
    DisconnectRequest, "disconnect", Disconnect
);
bare_request!(GetCommandsRequest, "getcommands", CommandList);
bare_request!(GetFlowsRequest, "getflows", FlowsList);
bare_request!(GetLayoutsRequest, "getlayouts", LayoutsList);
bare_request!(GetLibraryCollectionsRequest, "getlibrarycollections", LibraryCollectionsList);
bare_request!(GetPlaybackTechniquesRequest, "getplaybacktechniques", PlaybackTechniquesList);
bare_request!(GetPropertiesRequest, "getproperties", PropertiesList);
bare_request!(
    /// Full status snapshot. Its reply replaces the cached baseline.
    GetStatusRequest, "getstatus", Status
);

// =============================================================================
// SESSION HANDSHAKE
// =============================================================================

/// First contact without a session token; the host replies with a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub client_name: String,
    pub handshake_version: String,
}

impl ConnectRequest {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            handshake_version: DEFAULT_HANDSHAKE_VERSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_handshake_version(mut self, version: impl Into<String>) -> Self {
        self.handshake_version = version.into();
        self
    }
}

impl Request for ConnectRequest {
    fn message_id(&self) -> &'static str {
        "connect"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::SessionToken
    }

    fn fields(&self) -> Map<String, Value> {
        object(json!({
            "clientName": self.client_name,
            "handshakeVersion": self.handshake_version,
        }))
    }
}

/// Reconnect with a token from an earlier session. Success is `kConnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectWithSessionRequest {
    pub client_name: String,
    pub session_token: String,
    pub handshake_version: String,
}

impl ConnectWithSessionRequest {
    pub fn new(client_name: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            session_token: session_token.into(),
            handshake_version: DEFAULT_HANDSHAKE_VERSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_handshake_version(mut self, version: impl Into<String>) -> Self {
        self.handshake_version = version.into();
        self
    }
}

impl Request for ConnectWithSessionRequest {
    fn message_id(&self) -> &'static str {
        "connect"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Code
    }

    fn fields(&self) -> Map<String, Value> {
        object(json!({
            "clientName": self.client_name,
            "handshakeVersion": self.handshake_version,
            "sessionToken": self.session_token,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptSessionTokenRequest {
    pub session_token: String,
}

impl AcceptSessionTokenRequest {
    pub fn new(session_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
        }
    }
}

impl Request for AcceptSessionTokenRequest {
    fn message_id(&self) -> &'static str {
        "acceptsessiontoken"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Code
    }

    fn fields(&self) -> Map<String, Value> {
        object(json!({ "sessionToken": self.session_token }))
    }
}

// =============================================================================
// QUERIES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetAppInfoRequest;

impl Request for GetAppInfoRequest {
    fn message_id(&self) -> &'static str {
        "getappinfo"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Version
    }

    fn fields(&self) -> Map<String, Value> {
        object(json!({ "info": "version" }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetLibraryEntitiesRequest {
    pub collection: String,
}

impl GetLibraryEntitiesRequest {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

impl Request for GetLibraryEntitiesRequest {
    fn message_id(&self) -> &'static str {
        "getlibraryentities"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::LibraryEntitiesList
    }

    fn fields(&self) -> Map<String, Value> {
        object(json!({ "collection": self.collection }))
    }
}

/// Which options to fetch. Layout and notation options need an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsTarget {
    Engraving,
    Layout(i64),
    Notation(i64),
}

impl OptionsTarget {
    #[must_use]
    pub fn options_type(self) -> OptionsType {
        match self {
            Self::Engraving => OptionsType::Engraving,
            Self::Layout(_) => OptionsType::Layout,
            Self::Notation(_) => OptionsType::Notation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptionsRequest {
    pub target: OptionsTarget,
}

impl GetOptionsRequest {
    #[must_use]
    pub fn new(target: OptionsTarget) -> Self {
        Self { target }
    }
}

impl Request for GetOptionsRequest {
    fn message_id(&self) -> &'static str {
        "getoptions"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::OptionsList
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = object(json!({ "optionsType": self.target.options_type() }));
        match self.target {
            OptionsTarget::Engraving => {}
            OptionsTarget::Layout(id) => {
                fields.insert("layoutID".into(), Value::from(id));
            }
            OptionsTarget::Notation(id) => {
                fields.insert("flowID".into(), Value::from(id));
            }
        }
        fields
    }
}

// =============================================================================
// SET OPTIONS
// =============================================================================

/// One option assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue {
    pub path: String,
    pub value: String,
}

impl OptionValue {
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({ "path": self.path, "value": self.value })
    }
}

/// Which layouts or flows a `setoptions` call applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope<G> {
    /// Let the host decide (no id field sent).
    #[default]
    Unspecified,
    /// Explicit ids.
    Ids(Vec<i64>),
    /// A symbolic group such as `kAllPartLayouts`.
    Group(G),
}

impl<G: fmt::Display> Scope<G> {
    fn to_json(&self) -> Option<Value> {
        match self {
            Self::Unspecified => None,
            Self::Ids(ids) => Some(Value::Array(
                ids.iter().map(|id| Value::from(id.to_string())).collect(),
            )),
            Self::Group(group) => Some(Value::from(group.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOptionsTarget {
    Engraving,
    Layout(Scope<LayoutIds>),
    Notation(Scope<FlowIds>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOptionsRequest {
    pub target: SetOptionsTarget,
    pub values: Vec<OptionValue>,
}

impl SetOptionsRequest {
    #[must_use]
    pub fn engraving(values: Vec<OptionValue>) -> Self {
        Self {
            target: SetOptionsTarget::Engraving,
            values,
        }
    }

    #[must_use]
    pub fn layout(values: Vec<OptionValue>, scope: Scope<LayoutIds>) -> Self {
        Self {
            target: SetOptionsTarget::Layout(scope),
            values,
        }
    }

    #[must_use]
    pub fn notation(values: Vec<OptionValue>, scope: Scope<FlowIds>) -> Self {
        Self {
            target: SetOptionsTarget::Notation(scope),
            values,
        }
    }

    #[must_use]
    pub fn options_type(&self) -> OptionsType {
        match self.target {
            SetOptionsTarget::Engraving => OptionsType::Engraving,
            SetOptionsTarget::Layout(_) => OptionsType::Layout,
            SetOptionsTarget::Notation(_) => OptionsType::Notation,
        }
    }
}

impl Request for SetOptionsRequest {
    fn message_id(&self) -> &'static str {
        "setoptions"
    }

    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Code
    }

    fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("optionsType".into(), Value::from(self.options_type().wire_name()));
        let scope = match &self.target {
            SetOptionsTarget::Engraving => None,
            SetOptionsTarget::Layout(scope) => scope.to_json().map(|v| ("layoutIDs", v)),
            SetOptionsTarget::Notation(scope) => scope.to_json().map(|v| ("flowIDs", v)),
        };
        if let Some((key, value)) = scope {
            fields.insert(key.into(), value);
        }
        fields.insert(
            "optionvalues".into(),
            Value::Array(self.values.iter().map(OptionValue::to_json).collect()),
        );
        fields
    }
}
