//! Row-change statement builders.
//!
//! Compiles structured insert/update/delete descriptors into SQL text.
//! Literal values go through [`escape_string`]; identifiers through the
//! dialect's [`wrap_identifier`].

use crate::models::EngineKind;
use crate::sql::dialect::{wrap_identifier, wrap_table};
use crate::sql::escape::{SqlLiteral, escape_string};
use crate::sql::filters::{FilterJoin, TableFilter, build_database_filter};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// One row of insert/update data: ordered column name to value.
pub type RowData = JsonMap<String, JsonValue>;

/// Column metadata consulted by the insert builder for bit-typed columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub column_name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableInsert {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub data: Vec<RowData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableUpdate {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub filters: Vec<TableFilter>,
    #[serde(default)]
    pub data: RowData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDelete {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub filters: Vec<TableFilter>,
}

/// A batch of pending row-level mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub inserts: Vec<TableInsert>,
    #[serde(default)]
    pub updates: Vec<TableUpdate>,
    #[serde(default)]
    pub deletes: Vec<TableDelete>,
}

/// Engine-specific upsert statement factory. Receives the insert
/// descriptor, the (already bit-converted) row data, and the primary key
/// columns.
pub type UpsertFactory<'a> = &'a dyn Fn(&TableInsert, &[RowData], &[String]) -> String;

fn escape_json(value: &JsonValue) -> String {
    escape_string(&SqlLiteral::from_json(value))
}

/// Convert bit-typed column values in place, per the engine's bit-literal
/// convention. `bit(1)` columns pass through the caller's conversion;
/// wider bit columns parse the `b'1010'` binary-literal form.
fn convert_bit_columns(
    row: &mut RowData,
    columns: &[TableColumn],
    bit_conversion: &dyn Fn(&JsonValue) -> JsonValue,
) {
    let keys: Vec<String> = row.keys().cloned().collect();
    for key in keys {
        let Some(column) = columns.iter().find(|c| c.column_name == key) else {
            continue;
        };
        let Some(value) = row.get(&key) else { continue };
        if value.is_null() {
            continue;
        }
        if column.data_type.starts_with("bit(") {
            let converted = if column.data_type == "bit(1)" {
                bit_conversion(value)
            } else {
                parse_wide_bit_literal(value)
            };
            row.insert(key, converted);
        } else if column.data_type.starts_with("bit") && value.is_boolean() {
            let bit = if value.as_bool() == Some(true) { 1 } else { 0 };
            row.insert(key, JsonValue::from(bit));
        }
    }
}

fn parse_wide_bit_literal(value: &JsonValue) -> JsonValue {
    let text = match value.as_str() {
        Some(text) => text,
        None => return value.clone(),
    };
    // b'1010' -> 10
    match text.split('\'').nth(1) {
        Some(bits) => match i64::from_str_radix(bits, 2) {
            Ok(parsed) => JsonValue::from(parsed),
            Err(_) => value.clone(),
        },
        None => value.clone(),
    }
}

/// Rekey columns containing a literal `?` so they cannot collide with
/// statement placeholders downstream.
fn escape_placeholder_columns(row: &mut RowData) {
    let conflicting: Vec<String> = row
        .keys()
        .filter(|k| k.contains('?'))
        .cloned()
        .collect();
    for key in conflicting {
        if let Some(value) = row.remove(&key) {
            row.insert(key.replace('?', "\\?"), value);
        }
    }
}

fn insert_values_clause(columns: &[String], data: &[RowData]) -> String {
    let tuples: Vec<String> = data
        .iter()
        .map(|row| {
            let values: Vec<String> = columns
                .iter()
                .map(|column| {
                    row.get(column)
                        .map(escape_json)
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();
    tuples.join(", ")
}

/// Build an INSERT statement for the given rows.
///
/// Row data is deep-copied before bit conversion and placeholder-column
/// rekeying. When `run_as_upsert` is set and every primary-key column is
/// present in the row data, the statement is emitted via the
/// engine-specific factory when supplied, or as a generic
/// insert-on-conflict-merge otherwise.
pub fn build_insert_query(
    engine: EngineKind,
    insert: &TableInsert,
    columns: &[TableColumn],
    primary_keys: &[String],
    run_as_upsert: bool,
    upsert_factory: Option<UpsertFactory<'_>>,
    bit_conversion: &dyn Fn(&JsonValue) -> JsonValue,
) -> String {
    let mut data = insert.data.clone();
    if data.is_empty() {
        return String::new();
    }

    let can_run_as_upsert = run_as_upsert
        && !primary_keys.is_empty()
        && primary_keys.iter().all(|pk| data[0].contains_key(pk));

    for row in &mut data {
        convert_bit_columns(row, columns, bit_conversion);
        escape_placeholder_columns(row);
    }

    if can_run_as_upsert {
        if let Some(factory) = upsert_factory {
            return factory(insert, &data, primary_keys);
        }
    }

    let table = wrap_table(engine, insert.schema.as_deref(), &insert.table);
    let column_names: Vec<String> = data[0].keys().cloned().collect();
    let column_list: Vec<String> = column_names
        .iter()
        .map(|c| wrap_identifier(engine, c))
        .collect();

    let mut query = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        column_list.join(", "),
        insert_values_clause(&column_names, &data)
    );

    if can_run_as_upsert {
        let conflict_targets: Vec<String> = primary_keys
            .iter()
            .map(|pk| wrap_identifier(engine, pk))
            .collect();
        let merge_columns: Vec<String> = column_names
            .iter()
            .filter(|c| !primary_keys.contains(*c))
            .map(|c| {
                let quoted = wrap_identifier(engine, c);
                format!("{} = excluded.{}", quoted, quoted)
            })
            .collect();
        if merge_columns.is_empty() {
            query.push_str(&format!(
                " ON CONFLICT ({}) DO NOTHING",
                conflict_targets.join(", ")
            ));
        } else {
            query.push_str(&format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                conflict_targets.join(", "),
                merge_columns.join(", ")
            ));
        }
    }

    query
}

/// Build plain insert statements for a batch, without bit metadata.
pub fn build_insert_queries(
    engine: EngineKind,
    inserts: &[TableInsert],
    primary_keys: &[String],
    run_as_upsert: bool,
    upsert_factory: Option<UpsertFactory<'_>>,
) -> Vec<String> {
    inserts
        .iter()
        .map(|insert| {
            build_insert_query(
                engine,
                insert,
                &[],
                primary_keys,
                run_as_upsert,
                upsert_factory,
                &|v| v.clone(),
            )
        })
        .filter(|q| !q.is_empty())
        .collect()
}

/// Build UPDATE statements for a batch of row updates.
pub fn build_update_queries(engine: EngineKind, updates: &[TableUpdate]) -> Vec<String> {
    updates
        .iter()
        .map(|update| {
            let table = wrap_table(engine, update.schema.as_deref(), &update.table);
            let assignments: Vec<String> = update
                .data
                .iter()
                .map(|(column, value)| {
                    format!("{} = {}", wrap_identifier(engine, column), escape_json(value))
                })
                .collect();
            let where_clause = build_database_filter(&update.filters, FilterJoin::And);
            let mut query = format!("UPDATE {} SET {}", table, assignments.join(", "));
            if !where_clause.is_empty() {
                query.push(' ');
                query.push_str(&where_clause);
            }
            query
        })
        .collect()
}

/// Build SELECT statements matching the rows a batch of updates targets.
pub fn build_select_queries_from_updates(
    engine: EngineKind,
    updates: &[TableUpdate],
) -> Vec<String> {
    updates
        .iter()
        .map(|update| {
            let table = wrap_table(engine, update.schema.as_deref(), &update.table);
            let where_clause = build_database_filter(&update.filters, FilterJoin::And);
            let mut query = format!("SELECT * FROM {}", table);
            if !where_clause.is_empty() {
                query.push(' ');
                query.push_str(&where_clause);
            }
            query
        })
        .collect()
}

/// Build DELETE statements for a batch of row deletions.
pub fn build_delete_queries(engine: EngineKind, deletes: &[TableDelete]) -> Vec<String> {
    deletes
        .iter()
        .map(|delete| {
            let table = wrap_table(engine, delete.schema.as_deref(), &delete.table);
            let where_clause = build_database_filter(&delete.filters, FilterJoin::And);
            let mut query = format!("DELETE FROM {}", table);
            if !where_clause.is_empty() {
                query.push(' ');
                query.push_str(&where_clause);
            }
            query
        })
        .collect()
}

/// Join statements with `;` separators and a single trailing `;`.
pub fn join_queries(queries: &[String]) -> String {
    if queries.is_empty() {
        return String::new();
    }
    let joined = queries.join(";\n");
    if joined.ends_with(';') {
        joined
    } else {
        format!("{};", joined)
    }
}

/// Compile a change set into one statement batch: all inserts, then all
/// updates, then all deletes.
pub fn apply_changes_sql(engine: EngineKind, changes: &ChangeSet) -> String {
    let mut queries = Vec::new();
    queries.extend(build_insert_queries(engine, &changes.inserts, &[], false, None));
    queries.extend(build_update_queries(engine, &changes.updates));
    queries.extend(build_delete_queries(engine, &changes.deletes));
    join_queries(&queries)
}
