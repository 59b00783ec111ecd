//! # Responses
//!
//! Shapes of every message the host sends. Each shape is registered under
//! its `message` tag in [`crate::registry`]. Field names follow the host's
//! camelCase spelling; `ID`/`Id` variants are both accepted because the
//! host is not consistent about them.

use crate::collections::{LibraryEntityCollection, Organizable, OrganizedCollection};
use crate::enums::{
    ActivePlayModeTool, DragHandlesViewState, FilterBehaviour, LayoutType, NoteColoursType,
    NoteInputMode, NoteInputPitchMode, OptionsType, PagePositionPolicy, RhythmicGridResolution,
    ToolType, WindowMode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Code the host uses to signal a failed request.
pub const ERROR_CODE: &str = "kError";

/// Code returned when a session token is accepted on connect.
pub const CONNECTED_CODE: &str = "kConnected";

/// Discriminant for response shapes. Requests declare one; decoded
/// responses report one; the engine compares them by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Code,
    SessionToken,
    Version,
    CommandList,
    FlowsList,
    LayoutsList,
    LibraryCollectionsList,
    LibraryEntitiesList,
    OptionsList,
    PlaybackTechniquesList,
    PropertiesList,
    Status,
    SelectionChanged,
    OptionsChanged,
    PlaybackConfigurationChanged,
    LibraryChanged,
    /// Closing handshake. Never sent as a JSON message.
    Disconnect,
}

impl ResponseKind {
    /// Wire tag of the shape.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Code => "response",
            Self::SessionToken => "sessiontoken",
            Self::Version => "version",
            Self::CommandList => "commandlist",
            Self::FlowsList => "flowslist",
            Self::LayoutsList => "layoutslist",
            Self::LibraryCollectionsList => "librarycollectionslist",
            Self::LibraryEntitiesList => "libraryentitieslist",
            Self::OptionsList => "optionslist",
            Self::PlaybackTechniquesList => "playbacktechniqueslist",
            Self::PropertiesList => "propertieslist",
            Self::Status => "status",
            Self::SelectionChanged => "selectionchanged",
            Self::OptionsChanged => "optionschanged",
            Self::PlaybackConfigurationChanged => "playbackconfigurationchanged",
            Self::LibraryChanged => "librarychanged",
            Self::Disconnect => "disconnect",
        }
    }

    /// Whether the host may send this shape without being asked.
    #[must_use]
    pub fn is_unprompted(self) -> bool {
        matches!(
            self,
            Self::Status
                | Self::SelectionChanged
                | Self::OptionsChanged
                | Self::PlaybackConfigurationChanged
                | Self::LibraryChanged
        )
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// GENERIC RESPONSES
// =============================================================================

/// `{"message":"response","code":...,"detail":...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl CodeResponse {
    /// True for the protocol-level failure code.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.code == ERROR_CODE
    }
}

impl fmt::Display for CodeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} {}", self.code, detail),
            None => f.write_str(&self.code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokenResponse {
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub variant: String,
    pub number: String,
}

impl fmt::Display for VersionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.variant, self.number)
    }
}

// =============================================================================
// CATALOG RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub required_parameters: Vec<String>,
    #[serde(default)]
    pub optional_parameters: Vec<String>,
}

impl Organizable for CommandInfo {
    fn name_key(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CommandInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name.as_deref().unwrap_or(&self.name))
    }
}

pub type CommandCollection = OrganizedCollection<CommandInfo>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandListResponse {
    #[serde(default)]
    pub commands: CommandCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    #[serde(rename = "flowID", alias = "flowId")]
    pub flow_id: i64,
    #[serde(rename = "flowName")]
    pub flow_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowsListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(rename = "layoutID", alias = "layoutId")]
    pub layout_id: i64,
    #[serde(rename = "layoutName")]
    pub layout_name: String,
    #[serde(rename = "layoutNumber", default)]
    pub layout_number: i64,
    #[serde(rename = "layoutType", default)]
    pub layout_type: LayoutType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutsListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub layouts: Vec<Layout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryCollectionsListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub collections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntity {
    pub entity_id: String,
    pub name: String,
    #[serde(default)]
    pub playback_technique_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntitiesListResponse {
    #[serde(rename = "openScoreId", alias = "openScoreID", default)]
    pub open_score_id: i64,
    #[serde(rename = "libraryEntities", default)]
    pub library_entities: LibraryEntityCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInfo {
    pub path: String,
    pub value_type: String,
    #[serde(default)]
    pub current_value: String,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
}

impl Organizable for OptionInfo {
    fn name_key(&self) -> &str {
        &self.path
    }
}

pub type OptionCollection = OrganizedCollection<OptionInfo>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(rename = "optionsType", default)]
    pub options_type: OptionsType,
    #[serde(default)]
    pub options: OptionCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMapEntry {
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(default)]
    pub playback_technique_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMap {
    pub expression_map_id: String,
    #[serde(default)]
    pub expression_map_entries: Vec<ExpressionMapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumKitNoteMapEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub instrument_id: String,
    pub pitch: i64,
    #[serde(default)]
    pub key_switches: Option<Vec<i64>>,
    #[serde(default)]
    pub playback_technique_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrumKitNoteMap {
    pub drum_kit_note_map_id: String,
    #[serde(default)]
    pub drum_kit_note_map_entries: Vec<DrumKitNoteMapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackTechniquesListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub expression_maps: Vec<ExpressionMap>,
    #[serde(default)]
    pub drum_kit_note_maps: Vec<DrumKitNoteMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub current_value: Option<String>,
    #[serde(default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub set_globally: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesListResponse {
    #[serde(rename = "openScoreID", alias = "openScoreId", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub current_scope: String,
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

// =============================================================================
// UNPROMPTED RESPONSES
// =============================================================================

/// Snapshot of host UI state. Pushed whenever something changes, usually
/// as a partial object; every field therefore has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusResponse {
    #[serde(rename = "activeOpenScoreID", alias = "activeOpenScoreId")]
    pub active_open_score_id: i64,
    #[serde(rename = "activeViewContainerID", alias = "activeViewContainerId")]
    pub active_view_container_id: i64,
    pub has_score: bool,
    pub can_undo: bool,
    pub has_selection: bool,
    pub in_playback: bool,
    pub is_recording: bool,
    pub in_step_time_input: bool,
    pub not_read_only: bool,
    pub note_input_mode: NoteInputMode,
    pub tab_bar_shown: bool,
    pub toolbar_shown: bool,
    pub left_panel_shown: bool,
    pub right_panel_shown: bool,
    pub bottom_panel_shown: bool,
    pub all_panels_hidden: bool,
    pub fixed_tempo_mode: bool,
    pub show_time_track: bool,
    pub show_chord_track: bool,
    pub show_video_track: bool,
    pub show_marker_track: bool,
    pub click_enabled: bool,
    pub rhythmic_grid_resolution_value: RhythmicGridResolution,
    pub note_input_pitch_mode_value: NoteInputPitchMode,
    pub filter_behaviour: FilterBehaviour,
    pub page_position_policy: PagePositionPolicy,
    pub note_colours_type: NoteColoursType,
    pub signposts_suppressed: bool,
    pub drag_handles_view_state: DragHandlesViewState,
    pub show_bar_numbers_in_page_view: bool,
    pub show_bar_numbers_in_galley_view: bool,
    pub show_implicit_rests_in_grey: bool,
    pub show_cues_in_grey: bool,
    pub show_divisi_unison_in_grey: bool,
    pub show_condensed_music_in_grey: bool,
    pub show_muted_events_in_grey: bool,
    pub attachment_lines_shown: bool,
    pub highlight_cues: bool,
    pub highlight_slash_regions: bool,
    pub highlight_bar_repeat_regions: bool,
    pub highlight_chord_symbol_visibility_regions: bool,
    pub show_system_track: bool,
    pub show_comments: bool,
    pub window_mode: WindowMode,
    pub insert_active: bool,
    pub active_play_mode_tool: ActivePlayModeTool,
    pub tool_type: ToolType,
    pub zoom_percent: Option<String>,
    pub note_input_active: Option<bool>,
    pub video_window_shown: Option<bool>,
    pub mixer_shown: Option<bool>,
    pub transport_shown: Option<bool>,
    pub full_screen: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChanged {
    #[serde(rename = "openScoreId", alias = "openScoreID", default)]
    pub open_score_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryChanged {
    #[serde(rename = "openScoreId", alias = "openScoreID", default)]
    pub open_score_id: i64,
    #[serde(default)]
    pub collections: Vec<String>,
}

// =============================================================================
// DECODED RESPONSE
// =============================================================================

/// Any decoded host message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Code(CodeResponse),
    SessionToken(SessionTokenResponse),
    Version(VersionResponse),
    CommandList(CommandListResponse),
    FlowsList(FlowsListResponse),
    LayoutsList(LayoutsListResponse),
    LibraryCollectionsList(LibraryCollectionsListResponse),
    LibraryEntitiesList(LibraryEntitiesListResponse),
    OptionsList(OptionsListResponse),
    PlaybackTechniquesList(PlaybackTechniquesListResponse),
    PropertiesList(PropertiesListResponse),
    Status(Box<StatusResponse>),
    SelectionChanged(ScoreChanged),
    OptionsChanged(ScoreChanged),
    PlaybackConfigurationChanged(ScoreChanged),
    LibraryChanged(LibraryChanged),
}

impl Response {
    #[must_use]
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Code(_) => ResponseKind::Code,
            Self::SessionToken(_) => ResponseKind::SessionToken,
            Self::Version(_) => ResponseKind::Version,
            Self::CommandList(_) => ResponseKind::CommandList,
            Self::FlowsList(_) => ResponseKind::FlowsList,
            Self::LayoutsList(_) => ResponseKind::LayoutsList,
            Self::LibraryCollectionsList(_) => ResponseKind::LibraryCollectionsList,
            Self::LibraryEntitiesList(_) => ResponseKind::LibraryEntitiesList,
            Self::OptionsList(_) => ResponseKind::OptionsList,
            Self::PlaybackTechniquesList(_) => ResponseKind::PlaybackTechniquesList,
            Self::PropertiesList(_) => ResponseKind::PropertiesList,
            Self::Status(_) => ResponseKind::Status,
            Self::SelectionChanged(_) => ResponseKind::SelectionChanged,
            Self::OptionsChanged(_) => ResponseKind::OptionsChanged,
            Self::PlaybackConfigurationChanged(_) => ResponseKind::PlaybackConfigurationChanged,
            Self::LibraryChanged(_) => ResponseKind::LibraryChanged,
        }
    }

    /// The generic response when it carries the `kError` code.
    #[must_use]
    pub fn as_error(&self) -> Option<&CodeResponse> {
        match self {
            Self::Code(code) if code.is_error() => Some(code),
            _ => None,
        }
    }
}

/// A decoded response plus the exact text the host sent.
///
/// For a status push the response is the merged snapshot while `raw` is the
/// partial message as received.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub response: Response,
    pub raw: Arc<str>,
}

impl Envelope {
    pub fn new(response: Response, raw: impl Into<Arc<str>>) -> Self {
        Self {
            response,
            raw: raw.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ResponseKind {
        self.response.kind()
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}
