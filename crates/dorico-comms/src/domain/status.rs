//! Status cache.
//!
//! The host pushes `status` whenever its UI changes, usually carrying only
//! the fields that changed. The cache keeps the merged JSON baseline so a
//! partial push decodes into a complete snapshot.

use dorico_types::json::merge;
use dorico_types::responses::{ResponseKind, StatusResponse};
use dorico_types::TypesError;
use serde_json::{Map, Value};

/// Merged status baseline plus the last snapshot handed to callers.
#[derive(Debug, Clone)]
pub struct StatusCache {
    defaults: Value,
    baseline: Value,
    current: Option<StatusResponse>,
}

impl StatusCache {
    #[must_use]
    pub fn new() -> Self {
        let defaults = serde_json::to_value(StatusResponse::default())
            .unwrap_or_else(|_| Value::Object(Map::new()));
        Self {
            baseline: defaults.clone(),
            defaults,
            current: None,
        }
    }

    /// Take `snapshot` as the full state, discarding the previous baseline.
    /// Fields the snapshot leaves out fall back to their defaults.
    pub fn replace(&mut self, snapshot: &Value) -> Result<StatusResponse, TypesError> {
        self.commit(merge(&self.defaults, snapshot))
    }

    /// Fold a partial push onto the baseline. Omitted and `null` fields keep
    /// their previous values.
    pub fn patch(&mut self, patch: &Value) -> Result<StatusResponse, TypesError> {
        self.commit(merge(&self.baseline, patch))
    }

    /// The baseline only moves when the merged object decodes.
    fn commit(&mut self, merged: Value) -> Result<StatusResponse, TypesError> {
        let status =
            serde_json::from_value(merged.clone()).map_err(|e| TypesError::Decode {
                tag: ResponseKind::Status.tag().to_string(),
                reason: e.to_string(),
            })?;
        self.baseline = merged;
        Ok(status)
    }

    pub fn set_current(&mut self, status: StatusResponse) {
        self.current = Some(status);
    }

    /// Last status delivered, if any arrived on this connection.
    #[must_use]
    pub fn current(&self) -> Option<&StatusResponse> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    /// Forget everything; used when a new connection opens.
    pub fn reset(&mut self) {
        self.baseline = self.defaults.clone();
        self.current = None;
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}
