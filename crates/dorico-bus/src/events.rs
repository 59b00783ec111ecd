//! # Remote Events
//!
//! Events published when the host pushes something nobody asked for, and
//! when the connection goes away.

use dorico_types::responses::{LibraryChanged, Response, ScoreChanged, StatusResponse};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Merged status snapshot after a status push or a status reply.
    Status(Box<StatusResponse>),

    /// The selection in a score changed.
    SelectionChanged(ScoreChanged),

    /// Engraving, layout or notation options changed.
    OptionsChanged(ScoreChanged),

    PlaybackConfigurationChanged(ScoreChanged),

    /// Library collections were edited.
    LibraryChanged(LibraryChanged),

    /// The host closed the connection or the transport failed.
    Disconnected {
        /// WebSocket close code, if a close frame was received.
        code: Option<u16>,
        reason: Option<String>,
    },
}

impl RemoteEvent {
    /// Convert an unprompted response into an event. Returns `None` for
    /// shapes that are only ever sent as replies.
    #[must_use]
    pub fn from_response(response: &Response) -> Option<Self> {
        match response {
            Response::Status(status) => Some(Self::Status(status.clone())),
            Response::SelectionChanged(c) => Some(Self::SelectionChanged(*c)),
            Response::OptionsChanged(c) => Some(Self::OptionsChanged(*c)),
            Response::PlaybackConfigurationChanged(c) => {
                Some(Self::PlaybackConfigurationChanged(*c))
            }
            Response::LibraryChanged(c) => Some(Self::LibraryChanged(c.clone())),
            _ => None,
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Status(_) => EventTopic::Status,
            Self::SelectionChanged(_) => EventTopic::Selection,
            Self::OptionsChanged(_) => EventTopic::Options,
            Self::PlaybackConfigurationChanged(_) => EventTopic::Playback,
            Self::LibraryChanged(_) => EventTopic::Library,
            Self::Disconnected { .. } => EventTopic::Connection,
        }
    }

    /// Score the event concerns. Connection events concern every score.
    #[must_use]
    pub fn open_score_id(&self) -> Option<i64> {
        match self {
            Self::Status(s) => Some(s.active_open_score_id),
            Self::SelectionChanged(c)
            | Self::OptionsChanged(c)
            | Self::PlaybackConfigurationChanged(c) => Some(c.open_score_id),
            Self::LibraryChanged(c) => Some(c.open_score_id),
            Self::Disconnected { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    Status,
    Selection,
    Options,
    Playback,
    Library,
    /// Connection lifecycle (disconnects).
    Connection,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Open scores to include. Empty means all scores.
    pub open_score_ids: Vec<i64>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            open_score_ids: Vec::new(),
        }
    }

    /// Create a filter for events about specific scores.
    #[must_use]
    pub fn for_scores(open_score_ids: Vec<i64>) -> Self {
        Self {
            topics: Vec::new(),
            open_score_ids,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RemoteEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let score_match = self.open_score_ids.is_empty()
            || event
                .open_score_id()
                .map_or(true, |id| self.open_score_ids.contains(&id));

        topic_match && score_match
    }
}
