//! Statement classification and read-only enforcement.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) with the owning engine's
//! dialect so classification cannot be bypassed through formatting tricks.
//! In read-only mode only the allow-list {select, pragma, explain,
//! describe, show} may reach the driver.

use crate::error::{DbError, DbResult};
use crate::models::EngineKind;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// One statement ready for execution, with its classification.
#[derive(Debug, Clone)]
pub struct PlannedStatement {
    /// Statement text to hand to the driver.
    pub text: String,
    /// Command tag ("SELECT", "INSERT", ...).
    pub command: String,
    /// Whether to fetch a row set rather than an affected-row count.
    pub returns_rows: bool,
    /// Whether the statement passes the read-only allow-list.
    pub read_allowed: bool,
}

/// Get the SQL dialect for the given engine.
fn dialect_for(engine: EngineKind) -> Box<dyn Dialect> {
    match engine {
        EngineKind::MySql => Box::new(MySqlDialect {}),
        EngineKind::PostgreSql => Box::new(PostgreSqlDialect {}),
        EngineKind::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Classify a parsed statement: command tag, row-returning behavior, and
/// read-only admissibility.
pub fn classify_statement(stmt: &Statement) -> (&'static str, bool, bool) {
    match stmt {
        // Allow-listed, row-returning statements
        Statement::Query { .. } => ("SELECT", true, true),
        Statement::Pragma { .. } => ("PRAGMA", true, true),
        Statement::ExplainTable { .. } => ("DESCRIBE", true, true),
        Statement::Explain { .. } => ("EXPLAIN", true, true),
        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => ("SHOW", true, true),

        // DML writes
        Statement::Insert { .. } => ("INSERT", false, false),
        Statement::Update { .. } => ("UPDATE", false, false),
        Statement::Delete { .. } => ("DELETE", false, false),
        Statement::Merge { .. } => ("MERGE", false, false),
        Statement::Copy { .. } => ("COPY", false, false),

        // DDL
        Statement::CreateTable { .. } => ("CREATE TABLE", false, false),
        Statement::CreateView { .. } => ("CREATE VIEW", false, false),
        Statement::CreateIndex { .. } => ("CREATE INDEX", false, false),
        Statement::CreateSchema { .. } => ("CREATE SCHEMA", false, false),
        Statement::CreateDatabase { .. } => ("CREATE DATABASE", false, false),
        Statement::CreateVirtualTable { .. } => ("CREATE VIRTUAL TABLE", false, false),
        Statement::CreateTrigger { .. } => ("CREATE TRIGGER", false, false),
        Statement::AlterTable { .. } => ("ALTER TABLE", false, false),
        Statement::AlterView { .. } => ("ALTER VIEW", false, false),
        Statement::AlterIndex { .. } => ("ALTER INDEX", false, false),
        Statement::Drop { .. } => ("DROP", false, false),
        Statement::DropTrigger { .. } => ("DROP TRIGGER", false, false),
        Statement::DropFunction { .. } => ("DROP FUNCTION", false, false),
        Statement::Truncate { .. } => ("TRUNCATE", false, false),

        // Transaction control
        Statement::StartTransaction { .. } => ("BEGIN", false, false),
        Statement::Commit { .. } => ("COMMIT", false, false),
        Statement::Rollback { .. } => ("ROLLBACK", false, false),
        Statement::Savepoint { .. } => ("SAVEPOINT", false, false),
        Statement::ReleaseSavepoint { .. } => ("RELEASE SAVEPOINT", false, false),

        // Procedure calls
        Statement::Call { .. } => ("CALL", false, false),
        Statement::Execute { .. } => ("EXECUTE", false, false),
        Statement::Prepare { .. } => ("PREPARE", false, false),

        // Administrative
        Statement::Grant { .. } => ("GRANT", false, false),
        Statement::Revoke { .. } => ("REVOKE", false, false),
        Statement::Set { .. } => ("SET", false, false),
        Statement::Use { .. } => ("USE", false, false),
        Statement::Vacuum { .. } => ("VACUUM", false, false),
        Statement::Analyze { .. } => ("ANALYZE", false, false),
        Statement::AttachDatabase { .. } => ("ATTACH", false, false),
        Statement::LockTables { .. } => ("LOCK", false, false),
        Statement::UnlockTables => ("UNLOCK", false, false),
        Statement::Flush { .. } => ("FLUSH", false, false),

        // Conservative default
        _ => ("UNKNOWN", false, false),
    }
}

/// Check a set of classified statements against the read-only policy.
/// A no-op when the connection is not in read-only mode.
pub fn check_read_only(statements: &[PlannedStatement], read_only: bool) -> DbResult<()> {
    if !read_only {
        return Ok(());
    }
    for stmt in statements {
        if !stmt.read_allowed {
            return Err(DbError::read_only_violation(stmt.command.clone()));
        }
    }
    Ok(())
}

/// Parse statement text into an execution plan and enforce the read-only
/// policy before anything can reach the driver.
///
/// When the text does not parse, a single raw pass-through statement is
/// planned for non-read-only connections; read-only connections reject
/// it, since an unclassifiable statement cannot match the allow-list.
pub fn plan_statements(
    sql: &str,
    engine: EngineKind,
    read_only: bool,
) -> DbResult<Vec<PlannedStatement>> {
    let dialect = dialect_for(engine);
    let planned = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => {
            if statements.is_empty() {
                return Err(DbError::sql("Empty SQL statement", None));
            }
            let single = statements.len() == 1;
            statements
                .iter()
                .map(|stmt| {
                    let (command, returns_rows, read_allowed) = classify_statement(stmt);
                    PlannedStatement {
                        // Preserve the user's own text when there is only
                        // one statement; multi-statement input is split via
                        // the parsed form.
                        text: if single {
                            sql.trim().trim_end_matches(';').to_string()
                        } else {
                            stmt.to_string()
                        },
                        command: command.to_string(),
                        returns_rows,
                        read_allowed,
                    }
                })
                .collect()
        }
        Err(_) if !read_only => vec![PlannedStatement {
            text: sql.to_string(),
            command: "UNKNOWN".to_string(),
            returns_rows: true,
            read_allowed: false,
        }],
        Err(e) => {
            return Err(DbError::read_only_violation(format!(
                "unparseable statement ({})",
                e
            )));
        }
    };

    check_read_only(&planned, read_only)?;
    Ok(planned)
}
