//! Per-engine dialect helpers: identifier quoting and schema-change DDL.

use crate::models::EngineKind;
use serde::{Deserialize, Serialize};

/// Quote an identifier for the given engine. MySQL uses backticks,
/// PostgreSQL and SQLite double quotes; embedded quote characters are
/// doubled.
pub fn wrap_identifier(engine: EngineKind, identifier: &str) -> String {
    match engine {
        EngineKind::MySql => format!("`{}`", identifier.replace('`', "``")),
        EngineKind::PostgreSql | EngineKind::Sqlite => {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }
}

/// Quote a possibly schema-qualified table reference.
pub fn wrap_table(engine: EngineKind, schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => format!(
            "{}.{}",
            wrap_identifier(engine, schema),
            wrap_identifier(engine, table)
        ),
        _ => wrap_identifier(engine, table),
    }
}

/// An index slated for removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropIndexSpec {
    pub name: String,
}

/// Schema-change DDL generation, one builder per dialect.
///
/// The base contract covers the shared pieces; engines with divergent
/// DDL syntax override the specific method.
pub trait ChangeBuilder {
    fn engine(&self) -> EngineKind;
    fn table(&self) -> &str;

    fn wrap_identifier(&self, identifier: &str) -> String {
        wrap_identifier(self.engine(), identifier)
    }

    /// DDL dropping the given indexes, or None when there is nothing to
    /// drop.
    fn drop_indexes(&self, drops: &[DropIndexSpec]) -> Option<String> {
        if drops.is_empty() {
            return None;
        }
        let statements: Vec<String> = drops
            .iter()
            .map(|drop| format!("DROP INDEX {}", self.wrap_identifier(&drop.name)))
            .collect();
        Some(statements.join(";"))
    }
}

pub struct SqliteChangeBuilder {
    table: String,
}

impl SqliteChangeBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl ChangeBuilder for SqliteChangeBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn table(&self) -> &str {
        &self.table
    }
}

pub struct PostgresChangeBuilder {
    table: String,
}

impl PostgresChangeBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl ChangeBuilder for PostgresChangeBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::PostgreSql
    }

    fn table(&self) -> &str {
        &self.table
    }
}

pub struct MysqlChangeBuilder {
    table: String,
}

impl MysqlChangeBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl ChangeBuilder for MysqlChangeBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::MySql
    }

    fn table(&self) -> &str {
        &self.table
    }

    // MySQL has no bare DROP INDEX; the index is dropped through the
    // owning table.
    fn drop_indexes(&self, drops: &[DropIndexSpec]) -> Option<String> {
        if drops.is_empty() {
            return None;
        }
        let table = self.wrap_identifier(&self.table);
        let statements: Vec<String> = drops
            .iter()
            .map(|drop| {
                format!(
                    "ALTER TABLE {} DROP INDEX {}",
                    table,
                    self.wrap_identifier(&drop.name)
                )
            })
            .collect();
        Some(statements.join(";"))
    }
}
