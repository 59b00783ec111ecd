//! # JSON Patch-Merge
//!
//! Status pushes from the host are usually partial: only the fields that
//! changed are present. [`merge`] folds such a patch onto the last known
//! snapshot so omitted fields keep their previous values.

use serde_json::{Map, Value};

/// Merge `incoming` onto `baseline` and return the combined object.
///
/// - A baseline property that is absent or `null` in `incoming` is kept.
/// - A non-null property in `incoming` replaces the baseline value
///   wholesale. Nested objects and arrays are not merged.
/// - A property that only `incoming` has is written, even when `null`.
///
/// Neither input is modified. A non-object operand counts as `{}`.
#[must_use]
pub fn merge(baseline: &Value, incoming: &Value) -> Value {
    let empty = Map::new();
    let base = baseline.as_object().unwrap_or(&empty);
    let patch = incoming.as_object().unwrap_or(&empty);

    let mut out = Map::with_capacity(base.len() + patch.len());

    for (key, value) in base {
        match patch.get(key) {
            Some(new) if !new.is_null() => {
                out.insert(key.clone(), new.clone());
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }

    for (key, value) in patch {
        if !base.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    Value::Object(out)
}
