//! Index definition used when provisioning the audit log index.

use serde_json::{json, Value as JsonValue};
use std::path::Path;

use gatelog_core::{CoreError, CoreResult};

/// Builtin mappings for the audit index.
///
/// `timestamp` is a date so it sorts chronologically and `indices` is a
/// keyword so it is stored verbatim. Request/response bodies are kept in
/// `_source` but not indexed.
pub fn default_index_schema() -> JsonValue {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "dynamic": true,
            "properties": {
                "timestamp": { "type": "date" },
                "indices": { "type": "keyword" },
                "category": { "type": "keyword" },
                "request": { "type": "object", "enabled": false },
                "response": { "type": "object", "enabled": false }
            }
        }
    })
}

/// Read an index definition from a JSON file.
pub async fn load_index_schema(path: &Path) -> CoreResult<JsonValue> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        CoreError::internal(format!(
            "unable to read index schema {}: {e}",
            path.display()
        ))
    })?;

    let schema: JsonValue = serde_json::from_str(&raw)?;
    if !schema.is_object() {
        return Err(CoreError::DeserializationError(format!(
            "index schema {} must be a JSON object",
            path.display()
        )));
    }
    Ok(schema)
}
