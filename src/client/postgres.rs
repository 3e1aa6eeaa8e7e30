//! PostgreSQL client.

use crate::client::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS, DatabaseClient, connection_suggestion, decode,
};
use crate::error::{DbError, DbResult};
use crate::models::{
    EngineConfig, EngineKind, RawQueryResult, ServerConfig, TableListOptions, TableRef,
};
use crate::sql::readonly::plan_statements;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Executor, Row};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct PostgresClient {
    config: EngineConfig,
    database: Option<String>,
    read_only: bool,
    pool: Option<PgPool>,
    server_version: Option<String>,
}

impl PostgresClient {
    pub fn new(server: ServerConfig, database: Option<String>) -> Self {
        let database = database
            .filter(|d| !d.is_empty())
            .or_else(|| server.config.default_database.clone())
            .filter(|d| !d.is_empty());
        Self {
            read_only: server.config.read_only,
            config: server.config,
            database,
            pool: None,
            server_version: None,
        }
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    fn pool(&self) -> DbResult<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| DbError::not_connected("postgresql"))
    }

    fn connect_options(&self) -> PgConnectOptions {
        let mut options =
            PgConnectOptions::new().host(self.config.host.as_deref().unwrap_or("localhost"));
        if let Some(port) = self.config.port {
            options = options.port(port);
        }
        if let Some(user) = &self.config.user {
            options = options.username(user);
        }
        if let Some(password) = &self.config.password {
            options = options.password(password);
        }
        if let Some(database) = &self.database {
            options = options.database(database);
        }
        options
    }
}

impl DatabaseClient for PostgresClient {
    async fn connect(&mut self) -> DbResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .idle_timeout(Some(DEFAULT_IDLE_TIMEOUT))
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(EngineKind::PostgreSql, &e),
                )
            })?;

        match sqlx::query_scalar::<_, String>("SELECT version()")
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
        let planned = plan_statements(sql, EngineKind::PostgreSql, self.read_only)?;

        let mut results = Vec::with_capacity(planned.len());
        for stmt in &planned {
            if stmt.returns_rows {
                let rows = pool
                    .fetch_all(stmt.text.as_str())
                    .await
                    .map_err(DbError::from)?;
                let (fields, raw_rows) = decode::postgres_rows(&rows);
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
            .fetch_all("SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname")
            .await
            .map_err(DbError::from)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(DbError::from))
            .collect()
    }

    async fn list_tables(&self, opts: &TableListOptions) -> DbResult<Vec<TableRef>> {
        let pool = self.pool()?;
        // A database override would need its own connection; only the
        // schema selector applies here.
        let schema = opts.schema.clone().unwrap_or_else(|| "public".to_string());

        let rows = sqlx::query(
            "SELECT table_name, table_schema \
             FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type IN ('BASE TABLE', 'VIEW') \
             ORDER BY table_name",
        )
        .bind(&schema)
        .fetch_all(pool)
        .await
        .map_err(DbError::from)?;

        rows.iter()
            .map(|row| {
                Ok(TableRef {
                    name: row.try_get("table_name").map_err(DbError::from)?,
                    schema: row.try_get("table_schema").ok(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_flag_propagates() {
        let server = ServerConfig::wrap(EngineConfig {
            host: Some("localhost".into()),
            user: Some("postgres".into()),
            read_only: true,
            ..Default::default()
        });
        let client = PostgresClient::new(server, None);
        assert!(client.read_only);
    }

    #[test]
    fn test_empty_database_override_ignored() {
        let server = ServerConfig::wrap(EngineConfig {
            default_database: Some("main".into()),
            ..Default::default()
        });
        let client = PostgresClient::new(server, Some(String::new()));
        assert_eq!(client.database.as_deref(), Some("main"));
    }
}
