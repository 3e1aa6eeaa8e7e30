//! Literal escaping.
//!
//! [`escape_string`] is the single source of literal-escaping truth: every
//! filter, insert, and update builder routes literal values through it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A value destined for inlining into a SQL statement.
///
/// Deserialization is untagged, so plain JSON scalars map naturally:
/// `null`, booleans, integers, floats, and strings. Byte and timestamp
/// literals are constructed programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlLiteral {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl SqlLiteral {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a plain JSON value into a literal. Arrays and objects are
    /// inlined as their JSON text.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            JsonValue::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for SqlLiteral {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlLiteral {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlLiteral {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlLiteral {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Custom serialization for byte literals as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Escape a literal value for inlining into a statement.
///
/// NULL becomes the bare keyword, booleans become `1`/`0`, numbers decimal
/// text, byte buffers a `0x`-prefixed hex literal, timestamps a quoted
/// ISO-8601 string, and everything else a single-quoted string with
/// embedded single quotes doubled.
pub fn escape_string(value: &SqlLiteral) -> String {
    match value {
        SqlLiteral::Null => "NULL".to_string(),
        SqlLiteral::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlLiteral::Int(n) => n.to_string(),
        SqlLiteral::Float(f) => f.to_string(),
        SqlLiteral::Bytes(bytes) => {
            let mut out = String::with_capacity(2 + bytes.len() * 2);
            out.push_str("0x");
            for b in bytes {
                out.push_str(&format!("{:02x}", b));
            }
            out
        }
        SqlLiteral::DateTime(ts) => {
            format!("'{}'", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        SqlLiteral::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_null() {
        assert_eq!(escape_string(&SqlLiteral::Null), "NULL");
    }

    #[test]
    fn test_escape_bool() {
        assert_eq!(escape_string(&SqlLiteral::Bool(true)), "1");
        assert_eq!(escape_string(&SqlLiteral::Bool(false)), "0");
    }

    #[test]
    fn test_escape_numbers() {
        assert_eq!(escape_string(&SqlLiteral::Int(42)), "42");
        assert_eq!(escape_string(&SqlLiteral::Float(1.5)), "1.5");
    }

    #[test]
    fn test_escape_quotes_doubled() {
        assert_eq!(escape_string(&"it's".into()), "'it''s'");
    }

    #[test]
    fn test_escape_bytes_as_hex() {
        assert_eq!(
            escape_string(&SqlLiteral::Bytes(vec![0xde, 0xad, 0x01])),
            "0xdead01"
        );
    }

    #[test]
    fn test_escape_datetime_iso() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            escape_string(&SqlLiteral::DateTime(ts)),
            "'2024-03-01T12:30:00.000Z'"
        );
    }

    #[test]
    fn test_literal_from_json() {
        assert_eq!(
            SqlLiteral::from_json(&serde_json::json!("abc")),
            SqlLiteral::Text("abc".into())
        );
        assert_eq!(
            SqlLiteral::from_json(&serde_json::json!(7)),
            SqlLiteral::Int(7)
        );
        assert_eq!(SqlLiteral::from_json(&serde_json::json!(null)), SqlLiteral::Null);
    }

    #[test]
    fn test_literal_untagged_deserialize() {
        let values: Vec<SqlLiteral> =
            serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                SqlLiteral::Null,
                SqlLiteral::Bool(true),
                SqlLiteral::Int(3),
                SqlLiteral::Float(2.5),
                SqlLiteral::Text("x".into())
            ]
        );
    }
}
