//! Transport sanitization.
//!
//! The recursive value transform applied to every row before it leaves
//! the core. The output contains only plain JSON: strings, numbers,
//! booleans, nulls, and base64 envelopes for byte payloads. The transform
//! is total and preserves key order and structure.

use crate::models::query::{QueryResult, RawQueryResult, RawRow, RawValue};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

/// Sanitize one raw driver value into transport-safe JSON.
pub fn sanitize_value(value: &RawValue) -> JsonValue {
    match value {
        RawValue::Null => JsonValue::Null,
        RawValue::Bool(b) => JsonValue::Bool(*b),
        RawValue::Int(n) => JsonValue::from(*n),
        RawValue::UInt(n) => JsonValue::from(*n),
        RawValue::Float(f) => {
            // Non-finite floats have no JSON representation; fall back to text
            serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(f.to_string()))
        }
        RawValue::Text(s) => JsonValue::String(s.clone()),
        RawValue::BigInt(digits) => JsonValue::String(digits.clone()),
        RawValue::Bytes(bytes) => json!({
            "__buffer": true,
            "data": STANDARD.encode(bytes),
        }),
        RawValue::TypedArray(bytes) => json!({
            "__typedarray": true,
            "data": STANDARD.encode(bytes),
        }),
        RawValue::Array(items) => JsonValue::Array(items.iter().map(sanitize_value).collect()),
        RawValue::Object(entries) => {
            let map: JsonMap<String, JsonValue> = entries
                .iter()
                .map(|(key, value)| (key.clone(), sanitize_value(value)))
                .collect();
            JsonValue::Object(map)
        }
        RawValue::Json(value) => sanitize_json(value),
    }
}

/// Sanitize an already-plain JSON value. Structure-preserving: a value
/// with no raw payloads comes back structurally identical, so the
/// transform is idempotent.
pub fn sanitize_json(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sanitize_json).collect()),
        JsonValue::Object(map) => {
            let out: JsonMap<String, JsonValue> = map
                .iter()
                .map(|(key, value)| (key.clone(), sanitize_json(value)))
                .collect();
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}

/// Sanitize one row into a JSON object, preserving column order.
pub fn sanitize_row(row: &RawRow) -> JsonValue {
    let map: JsonMap<String, JsonValue> = row
        .iter()
        .map(|(name, value)| (name.clone(), sanitize_value(value)))
        .collect();
    JsonValue::Object(map)
}

/// Sanitize a full statement result for transport.
pub fn sanitize_result(result: &RawQueryResult) -> QueryResult {
    QueryResult {
        command: result.command.clone(),
        row_count: result.row_count,
        affected_rows: result.affected_rows,
        fields: result.fields.clone(),
        rows: result.rows.iter().map(sanitize_row).collect(),
    }
}
