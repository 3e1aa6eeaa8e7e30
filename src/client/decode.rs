//! Per-engine row decoding.
//!
//! Type conversion is two-phase: [`TypeCategory`] classifies the driver
//! type name, then an engine-specific decoder extracts the value into
//! [`RawValue`]. DECIMAL/NUMERIC columns are preserved as exact decimal
//! text rather than lossy floats.

use crate::models::query::{FieldDescriptor, RawRow, RawValue};
use crate::models::EngineKind;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Unknown,
}

/// Classify a driver type name into a logical category.
pub fn categorize_type(type_name: &str, engine: EngineKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric first: overlaps with the float checks below
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC affinity is a float
        if engine == EngineKind::Sqlite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") || lower == "bit"
    {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    TypeCategory::Unknown
}

/// Raw DECIMAL/NUMERIC value captured as text. Preserves the exact
/// database representation.
#[derive(Debug)]
struct DecimalText(String);

impl Type<sqlx::MySql> for DecimalText {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for DecimalText {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(DecimalText(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for DecimalText {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for DecimalText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(DecimalText(s.to_string()))
    }
}

fn fields_of<R: Row>(rows: &[R]) -> Vec<FieldDescriptor> {
    match rows.first() {
        Some(row) => row
            .columns()
            .iter()
            .map(|col| FieldDescriptor::new(col.name(), col.type_info().name()))
            .collect(),
        None => Vec::new(),
    }
}

/// Decode a MySQL result set.
pub(crate) fn mysql_rows(rows: &[MySqlRow]) -> (Vec<FieldDescriptor>, Vec<RawRow>) {
    let fields = fields_of(rows);
    let decoded = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let type_name = col.type_info().name();
                    let category = categorize_type(type_name, EngineKind::MySql);
                    (col.name().to_string(), mysql_cell(row, idx, type_name, category))
                })
                .collect()
        })
        .collect();
    (fields, decoded)
}

fn mysql_cell(row: &MySqlRow, idx: usize, type_name: &str, category: TypeCategory) -> RawValue {
    match category {
        TypeCategory::Decimal => match row.try_get::<Option<DecimalText>, _>(idx) {
            Ok(Some(v)) => RawValue::BigInt(v.0),
            _ => RawValue::Null,
        },
        TypeCategory::Integer => {
            if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                return v.map(RawValue::Int).unwrap_or(RawValue::Null);
            }
            // BIGINT UNSIGNED values past i64 range
            if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
                return v.map(RawValue::UInt).unwrap_or(RawValue::Null);
            }
            RawValue::Null
        }
        TypeCategory::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bool)
            .unwrap_or(RawValue::Null),
        TypeCategory::Float => {
            if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
                return RawValue::Float(v);
            }
            if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
                return RawValue::Float(v as f64);
            }
            RawValue::Null
        }
        TypeCategory::Binary => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bytes)
            .unwrap_or(RawValue::Null),
        TypeCategory::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Json)
            .unwrap_or(RawValue::Null),
        _ => text_cell(row.try_get::<Option<String>, _>(idx).ok().flatten(), type_name),
    }
}

/// Decode a PostgreSQL result set.
pub(crate) fn postgres_rows(rows: &[PgRow]) -> (Vec<FieldDescriptor>, Vec<RawRow>) {
    let fields = fields_of(rows);
    let decoded = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let type_name = col.type_info().name();
                    let category = categorize_type(type_name, EngineKind::PostgreSql);
                    (
                        col.name().to_string(),
                        postgres_cell(row, idx, type_name, category),
                    )
                })
                .collect()
        })
        .collect();
    (fields, decoded)
}

fn postgres_cell(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> RawValue {
    match category {
        TypeCategory::Decimal => match row.try_get::<Option<DecimalText>, _>(idx) {
            Ok(Some(v)) => RawValue::BigInt(v.0),
            _ => RawValue::Null,
        },
        TypeCategory::Integer => {
            // PostgreSQL decoding is width-exact; try each integer type
            if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                return v.map(RawValue::Int).unwrap_or(RawValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
                return v.map(|n| RawValue::Int(n as i64)).unwrap_or(RawValue::Null);
            }
            if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
                return v.map(|n| RawValue::Int(n as i64)).unwrap_or(RawValue::Null);
            }
            RawValue::Null
        }
        TypeCategory::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bool)
            .unwrap_or(RawValue::Null),
        TypeCategory::Float => {
            if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
                return RawValue::Float(v);
            }
            if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
                return RawValue::Float(v as f64);
            }
            RawValue::Null
        }
        TypeCategory::Binary => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bytes)
            .unwrap_or(RawValue::Null),
        TypeCategory::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Json)
            .unwrap_or(RawValue::Null),
        TypeCategory::Uuid => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Text)
            .unwrap_or(RawValue::Null),
        _ => text_cell(row.try_get::<Option<String>, _>(idx).ok().flatten(), type_name),
    }
}

/// Decode a SQLite result set.
pub(crate) fn sqlite_rows(rows: &[SqliteRow]) -> (Vec<FieldDescriptor>, Vec<RawRow>) {
    let fields = fields_of(rows);
    let decoded = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let type_name = col.type_info().name();
                    let category = categorize_type(type_name, EngineKind::Sqlite);
                    (
                        col.name().to_string(),
                        sqlite_cell(row, idx, type_name, category),
                    )
                })
                .collect()
        })
        .collect();
    (fields, decoded)
}

fn sqlite_cell(row: &SqliteRow, idx: usize, type_name: &str, category: TypeCategory) -> RawValue {
    match category {
        TypeCategory::Integer => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Int)
            .unwrap_or(RawValue::Null),
        TypeCategory::Boolean => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bool)
            .unwrap_or(RawValue::Null),
        TypeCategory::Float | TypeCategory::Decimal => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Float)
            .unwrap_or(RawValue::Null),
        TypeCategory::Binary => row
            .try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(RawValue::Bytes)
            .unwrap_or(RawValue::Null),
        _ => text_cell(row.try_get::<Option<String>, _>(idx).ok().flatten(), type_name),
    }
}

fn text_cell(value: Option<String>, type_name: &str) -> RawValue {
    match value {
        Some(text) => {
            if type_name.to_lowercase().contains("json") {
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                    return RawValue::Json(json);
                }
            }
            RawValue::Text(text)
        }
        None => RawValue::Null,
    }
}
