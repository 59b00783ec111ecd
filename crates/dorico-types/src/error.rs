//! # Error Types
//!
//! Errors raised while building requests or decoding wire payloads.

use thiserror::Error;

/// Errors from the wire type layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypesError {
    /// A string did not name any variant of a wire enum.
    #[error("Unknown {kind} value: {value}")]
    UnknownEnumValue { kind: &'static str, value: String },

    /// Payload was not valid JSON or lacked a `message` tag.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The `message` tag is not in the registry.
    #[error("Unregistered message tag: {0}")]
    UnknownTag(String),

    /// JSON was valid but did not fit the registered shape.
    #[error("Failed to decode '{tag}': {reason}")]
    Decode { tag: String, reason: String },

    /// A request was missing a value it cannot be sent without.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from note construction and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("MIDI number out of range: {0} (must be 0..=127)")]
    MidiOutOfRange(i32),

    #[error("Octave out of range: {0} (must be -1..=9)")]
    OctaveOutOfRange(i32),

    #[error("Invalid pitch name: {0:?}")]
    InvalidPitch(String),
}

/// Errors from catalog collections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
