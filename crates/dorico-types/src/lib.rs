//! # Dorico Types
//!
//! Everything that crosses the wire between a client and the Dorico host,
//! plus the small helpers built on top of it.
//!
//! ## Layout
//!
//! ```text
//! requests     ── typed requests, each declaring its response kind
//! responses    ── response shapes + ResponseKind discriminant
//! registry     ── static tag -> shape table used by the receive loop
//! json         ── status patch-merge
//! enums        ── k-prefixed wire enums with tolerant decoding
//! commands     ── Command / CommandParameter
//! note         ── MIDI and pitch arithmetic
//! collections  ── name-keyed catalogs with dot-path trees
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod collections;
pub mod commands;
pub mod enums;
pub mod error;
pub mod json;
pub mod note;
pub mod registry;
pub mod requests;
pub mod responses;

pub use collections::{LibraryEntityCollection, Organizable, OrganizedCollection, OrganizedTreeNode};
pub use commands::{Command, CommandParameter};
pub use error::{CollectionError, NoteError, TypesError};
pub use json::merge;
pub use note::{Note, Spelling};
pub use registry::{parse_envelope, TypeRegistry};
pub use requests::Request;
pub use responses::{CodeResponse, Envelope, Response, ResponseKind, StatusResponse};
