//! Audit record domain model.
//!
//! Records are free-form JSON objects. Only two fields carry meaning for the
//! store: `indices` (resources the request touched, used by the read filter)
//! and `timestamp` (newest-first ordering). Everything else passes through.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, CoreResult};

/// Field holding the resources a request touched.
pub const INDICES_FIELD: &str = "indices";

/// Field used to order records newest-first.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// One persisted entry describing a processed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditRecord {
    fields: Map<String, JsonValue>,
}

impl AuditRecord {
    /// Create a record stamped with the current time and the given indices.
    #[must_use]
    pub fn new<I, S>(indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default()
            .with_timestamp(Utc::now())
            .with_indices(indices)
    }

    /// Wrap an arbitrary JSON object.
    pub fn from_value(value: JsonValue) -> CoreResult<Self> {
        match value {
            JsonValue::Object(fields) => Ok(Self { fields }),
            other => Err(CoreError::DeserializationError(format!(
                "audit record must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Set the resources this request touched.
    #[must_use]
    pub fn with_indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let indices = indices
            .into_iter()
            .map(|s| JsonValue::String(s.into()))
            .collect();
        self.fields
            .insert(INDICES_FIELD.to_string(), JsonValue::Array(indices));
        self
    }

    /// Set the ordering timestamp (RFC 3339, millisecond precision, UTC).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.fields.insert(
            TIMESTAMP_FIELD.to_string(),
            JsonValue::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        self
    }

    /// Attach any additional field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Read a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.fields.get(key)
    }

    /// The `indices` field, if present and a list of strings.
    pub fn indices(&self) -> CoreResult<Vec<String>> {
        indices_of(&self.fields)
    }

    /// Borrow the underlying field map.
    #[must_use]
    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// Consume into a JSON value.
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.fields)
    }
}

/// Extract the `indices` field of a decoded record.
///
/// Fails when the field is missing or is not an array made only of strings.
pub fn indices_of(fields: &Map<String, JsonValue>) -> CoreResult<Vec<String>> {
    let raw = fields.get(INDICES_FIELD).ok_or_else(|| {
        CoreError::DeserializationError(format!("unable to find \"{INDICES_FIELD}\" in log record"))
    })?;

    let items = raw.as_array().ok_or_else(|| {
        CoreError::DeserializationError(format!(
            "\"{INDICES_FIELD}\" must be an array, got {}",
            json_kind(raw)
        ))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                CoreError::DeserializationError(format!(
                    "\"{INDICES_FIELD}\" entries must be strings, got {}",
                    json_kind(item)
                ))
            })
        })
        .collect()
}

/// Whether every element of `wanted` appears in `available`.
#[must_use]
pub fn is_subset(wanted: &[String], available: &[String]) -> bool {
    wanted.iter().all(|w| available.iter().any(|a| a == w))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
