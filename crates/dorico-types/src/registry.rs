//! # Response Registry
//!
//! Static table from wire tag to response shape. The table is fixed at
//! compile time; adding a shape means adding a row.

use crate::error::TypesError;
use crate::responses::{
    CodeResponse, CommandListResponse, FlowsListResponse, LayoutsListResponse, LibraryChanged,
    LibraryCollectionsListResponse, LibraryEntitiesListResponse, OptionsListResponse,
    PlaybackTechniquesListResponse, PropertiesListResponse, Response, ResponseKind, ScoreChanged,
    SessionTokenResponse, StatusResponse, VersionResponse,
};
use serde_json::Value;

/// Name of the tag field in every envelope.
pub const MESSAGE_FIELD: &str = "message";

type Decoder = fn(Value) -> Result<Response, serde_json::Error>;

/// One registry row.
#[derive(Clone, Copy)]
pub struct Registration {
    pub kind: ResponseKind,
    decode: Decoder,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("kind", &self.kind).finish()
    }
}

macro_rules! row {
    ($kind:ident, $shape:ty, $wrap:expr) => {
        Registration {
            kind: ResponseKind::$kind,
            decode: |value| serde_json::from_value::<$shape>(value).map($wrap),
        }
    };
}

const STANDARD: &[Registration] = &[
    row!(Code, CodeResponse, Response::Code),
    row!(SessionToken, SessionTokenResponse, Response::SessionToken),
    row!(Version, VersionResponse, Response::Version),
    row!(CommandList, CommandListResponse, Response::CommandList),
    row!(FlowsList, FlowsListResponse, Response::FlowsList),
    row!(LayoutsList, LayoutsListResponse, Response::LayoutsList),
    row!(LibraryCollectionsList, LibraryCollectionsListResponse, Response::LibraryCollectionsList),
    row!(LibraryEntitiesList, LibraryEntitiesListResponse, Response::LibraryEntitiesList),
    row!(OptionsList, OptionsListResponse, Response::OptionsList),
    row!(PlaybackTechniquesList, PlaybackTechniquesListResponse, Response::PlaybackTechniquesList),
    row!(PropertiesList, PropertiesListResponse, Response::PropertiesList),
    row!(Status, StatusResponse, |s| Response::Status(Box::new(s))),
    row!(SelectionChanged, ScoreChanged, Response::SelectionChanged),
    row!(OptionsChanged, ScoreChanged, Response::OptionsChanged),
    row!(PlaybackConfigurationChanged, ScoreChanged, Response::PlaybackConfigurationChanged),
    row!(LibraryChanged, LibraryChanged, Response::LibraryChanged),
];

/// Lookup table from wire tag to shape.
#[derive(Debug, Clone, Copy)]
pub struct TypeRegistry {
    rows: &'static [Registration],
}

impl TypeRegistry {
    /// The registry for every shape the host is known to send.
    #[must_use]
    pub fn standard() -> Self {
        Self { rows: STANDARD }
    }

    #[must_use]
    pub fn lookup(&self, tag: &str) -> Option<&Registration> {
        self.rows.iter().find(|row| row.kind.tag() == tag)
    }

    /// Number of registered tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decode a JSON object into the shape registered for `tag`.
    pub fn decode(&self, tag: &str, value: Value) -> Result<Response, TypesError> {
        let row = self
            .lookup(tag)
            .ok_or_else(|| TypesError::UnknownTag(tag.to_string()))?;
        (row.decode)(value).map_err(|e| TypesError::Decode {
            tag: tag.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Parse raw text and pull out its `message` tag.
pub fn parse_envelope(text: &str) -> Result<(String, Value), TypesError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| TypesError::MalformedEnvelope(e.to_string()))?;
    let tag = value
        .get(MESSAGE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| TypesError::MalformedEnvelope("missing message tag".into()))?
        .to_string();
    Ok((tag, value))
}
