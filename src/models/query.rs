//! Query result models.
//!
//! Clients produce [`RawQueryResult`] values whose rows still contain
//! driver-native data (byte buffers, wide integers, exact decimals). The
//! registry runs them through the transport sanitizer to obtain
//! [`QueryResult`], which is representable with plain JSON only.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single decoded driver value. This is the only place raw
/// driver-native value types are allowed to exist; everything leaving the
/// core goes through the sanitizer first.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// Arbitrary-precision integer or exact decimal, as decimal text.
    BigInt(String),
    Bytes(Vec<u8>),
    /// Packed numeric array view.
    TypedArray(Vec<u8>),
    Array(Vec<RawValue>),
    Object(Vec<(String, RawValue)>),
    /// Driver-decoded JSON passed through as-is.
    Json(JsonValue),
}

/// One decoded row: column name/value pairs in result-set order.
pub type RawRow = Vec<(String, RawValue)>;

/// Column descriptor attached to a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    /// Driver-reported type (e.g., "INTEGER", "varchar", "int8").
    pub type_name: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Outcome of one executed statement, before transport sanitization.
#[derive(Debug, Clone)]
pub struct RawQueryResult {
    /// Command tag derived from statement classification ("SELECT", ...).
    pub command: String,
    pub row_count: u64,
    pub affected_rows: u64,
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<RawRow>,
}

/// Outcome of one executed statement in transport-safe form: rows hold
/// only strings, numbers, booleans, nulls, and base64 envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub command: String,
    pub row_count: u64,
    pub affected_rows: u64,
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<JsonValue>,
}

/// Reference to a table surfaced by list-tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Selectors for list-tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableListOptions {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_wire_shape() {
        let result = QueryResult {
            command: "SELECT".into(),
            row_count: 1,
            affected_rows: 0,
            fields: vec![FieldDescriptor::new("id", "INTEGER")],
            rows: vec![serde_json::json!({"id": 1})],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["command"], "SELECT");
        assert_eq!(value["rowCount"], 1);
        assert_eq!(value["affectedRows"], 0);
        assert_eq!(value["fields"][0]["typeName"], "INTEGER");
    }

    #[test]
    fn test_table_ref_omits_empty_schema() {
        let table = TableRef {
            name: "t".into(),
            schema: None,
        };
        let value = serde_json::to_value(&table).unwrap();
        assert!(value.get("schema").is_none());
    }
}
