//! SQLite client.

use crate::client::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS_SQLITE,
    DEFAULT_MIN_CONNECTIONS, DatabaseClient, connection_suggestion, decode,
};
use crate::error::{DbError, DbResult};
use crate::models::{EngineKind, RawQueryResult, ServerConfig, TableListOptions, TableRef};
use crate::sql::readonly::plan_statements;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SqliteClient {
    database: Option<String>,
    read_only: bool,
    pool: Option<SqlitePool>,
    server_version: Option<String>,
}

impl SqliteClient {
    pub fn new(server: ServerConfig, database: Option<String>) -> Self {
        // The database file path comes from the selector or the config
        let database = database
            .filter(|d| !d.is_empty())
            .or_else(|| server.config.database.clone())
            .filter(|d| !d.is_empty());
        Self {
            read_only: server.config.read_only,
            database,
            pool: None,
            server_version: None,
        }
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    fn pool(&self) -> DbResult<&SqlitePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| DbError::not_connected("sqlite"))
    }
}

impl DatabaseClient for SqliteClient {
    async fn connect(&mut self) -> DbResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let path = self.database.as_deref().ok_or_else(|| {
            DbError::connection(
                "SQLite database file path is missing",
                "Set the database field to the path of the database file",
            )
        })?;

        let mut options = SqliteConnectOptions::new().filename(path);
        if self.read_only {
            options = options.read_only(true);
        } else {
            options = options.create_if_missing(true);
        }

        let pool = SqlitePoolOptions::new()
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .max_connections(DEFAULT_MAX_CONNECTIONS_SQLITE)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .idle_timeout(Some(DEFAULT_IDLE_TIMEOUT))
            .connect_with(options)
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(EngineKind::Sqlite, &e),
                )
            })?;

        match sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
            .fetch_one(&pool)
            .await
        {
            Ok(version) => {
                debug!(version = %version, "Got server version");
                self.server_version = Some(version);
            }
            Err(e) => warn!(error = %e, "Failed to get server version"),
        }

        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> DbResult<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        Ok(())
    }

    async fn execute_query(&self, sql: &str) -> DbResult<Vec<RawQueryResult>> {
        let pool = self.pool()?;
        let planned = plan_statements(sql, EngineKind::Sqlite, self.read_only)?;

        let mut results = Vec::with_capacity(planned.len());
        for stmt in &planned {
            if stmt.returns_rows {
                let rows = pool
                    .fetch_all(stmt.text.as_str())
                    .await
                    .map_err(DbError::from)?;
                let (fields, raw_rows) = decode::sqlite_rows(&rows);
                results.push(RawQueryResult {
                    command: stmt.command.clone(),
                    row_count: raw_rows.len() as u64,
                    affected_rows: 0,
                    fields,
                    rows: raw_rows,
                });
            } else {
                let done = pool
                    .execute(stmt.text.as_str())
                    .await
                    .map_err(DbError::from)?;
                results.push(RawQueryResult {
                    command: stmt.command.clone(),
                    row_count: 0,
                    affected_rows: done.rows_affected(),
                    fields: Vec::new(),
                    rows: Vec::new(),
                });
            }
        }
        Ok(results)
    }

    async fn list_databases(&self) -> DbResult<Vec<String>> {
        let pool = self.pool()?;
        let rows = pool
            .fetch_all("PRAGMA database_list")
            .await
            .map_err(DbError::from)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DbError::from))
            .collect()
    }

    async fn list_tables(&self, _opts: &TableListOptions) -> DbResult<Vec<TableRef>> {
        let pool = self.pool()?;
        let rows = pool
            .fetch_all(
                "SELECT name FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )
            .await
            .map_err(DbError::from)?;
        rows.iter()
            .map(|row| {
                Ok(TableRef {
                    name: row.try_get("name").map_err(DbError::from)?,
                    schema: None,
                })
            })
            .collect()
    }
}
