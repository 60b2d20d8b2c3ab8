//! The item model collaborator
//!
//! The core asks very little of an item type: it must convert to and from a
//! plain field→value mapping (a JSON object) and be shareable across await
//! points. [`Model`] captures exactly that as a blanket trait, so any serde
//! struct — and `serde_json::Value` itself for schemaless use — qualifies
//! without ceremony. Structural validation is whatever deserialization
//! enforces; no extra validation framework is imposed.
//!
//! Field-by-name access happens on the record representation (the JSON
//! object), through the helpers below.

use crate::core::error::{RepoError, RepoResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Marker for types usable as repository items.
///
/// Blanket-implemented: any `Clone + Send + Sync + 'static` type with serde
/// support is a model.
pub trait Model: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Model for T where T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Convert an item into its record representation (a JSON object).
///
/// Fails with `Validation` when the item serializes to something other than
/// an object — repositories store field mappings, not bare scalars.
pub fn to_record<T: Model>(item: &T) -> RepoResult<Value> {
    let value = serde_json::to_value(item)?;
    if !value.is_object() {
        return Err(RepoError::validation(
            "item must serialize to a field mapping (JSON object)",
        ));
    }
    Ok(value)
}

/// Convert a native record back into an item.
pub fn from_record<T: Model>(record: Value) -> RepoResult<T> {
    Ok(serde_json::from_value(record)?)
}

/// Read a field from a record by name.
pub fn record_get<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    record.get(field)
}

/// Extract the id value from a record.
///
/// Fails with `Validation` when the field is absent or null — id-based
/// operations are undefined for items without a usable id.
pub fn record_id(record: &Value, id_field: &str) -> RepoResult<Value> {
    match record.get(id_field) {
        Some(Value::Null) | None => Err(RepoError::validation(format!(
            "item has no value for id field '{}'",
            id_field
        ))),
        Some(id) => Ok(id.clone()),
    }
}

/// Apply a set of field values onto a record in place.
///
/// Fails with `Validation` when the record is not an object.
pub fn apply_values(record: &mut Value, values: &Map<String, Value>) -> RepoResult<()> {
    let Some(fields) = record.as_object_mut() else {
        return Err(RepoError::validation(
            "cannot apply field values to a non-object record",
        ));
    };
    for (key, value) in values {
        fields.insert(key.clone(), value.clone());
    }
    Ok(())
}
