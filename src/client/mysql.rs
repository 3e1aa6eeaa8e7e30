//! MySQL client.

use crate::client::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS, DatabaseClient, connection_suggestion, decode,
};
use crate::error::{DbError, DbResult};
use crate::models::{
    EngineConfig, EngineKind, RawQueryResult, ServerConfig, TableListOptions, TableRef,
};
use crate::sql::readonly::plan_statements;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{Executor, Row};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct MysqlClient {
    config: EngineConfig,
    database: Option<String>,
    read_only: bool,
    pool: Option<MySqlPool>,
    server_version: Option<String>,
}

impl MysqlClient {
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

    fn pool(&self) -> DbResult<&MySqlPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| DbError::not_connected("mysql"))
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(self.config.host.as_deref().unwrap_or("localhost"))
            .charset("utf8mb4");
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

impl DatabaseClient for MysqlClient {
    async fn connect(&mut self) -> DbResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = MySqlPoolOptions::new()
            .min_connections(DEFAULT_MIN_CONNECTIONS)
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(DEFAULT_ACQUIRE_TIMEOUT)
            .idle_timeout(Some(DEFAULT_IDLE_TIMEOUT))
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                DbError::connection(
                    format!("Failed to connect: {}", e),
                    connection_suggestion(EngineKind::MySql, &e),
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
        let planned = plan_statements(sql, EngineKind::MySql, self.read_only)?;

        let mut results = Vec::with_capacity(planned.len());
        for stmt in &planned {
            if stmt.returns_rows {
                let rows = pool
                    .fetch_all(stmt.text.as_str())
                    .await
                    .map_err(DbError::from)?;
                let (fields, raw_rows) = decode::mysql_rows(&rows);
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
        let rows = pool.fetch_all("SHOW DATABASES").await.map_err(DbError::from)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(DbError::from))
            .collect()
    }

    async fn list_tables(&self, opts: &TableListOptions) -> DbResult<Vec<TableRef>> {
        let pool = self.pool()?;
        let database = opts.database.clone().or_else(|| self.database.clone());

        let rows = match &database {
            Some(db) => {
                sqlx::query(
                    "SELECT table_name AS name, table_schema AS schema_name \
                     FROM information_schema.tables \
                     WHERE table_schema = ? ORDER BY table_name",
                )
                .bind(db)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT table_name AS name, table_schema AS schema_name \
                     FROM information_schema.tables \
                     WHERE table_schema = DATABASE() ORDER BY table_name",
                )
                .fetch_all(pool)
                .await
            }
        }
        .map_err(DbError::from)?;

        rows.iter()
            .map(|row| {
                Ok(TableRef {
                    name: row.try_get("name").map_err(DbError::from)?,
                    schema: row.try_get("schema_name").ok(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_override_falls_back_to_default() {
        let server = ServerConfig::wrap(EngineConfig {
            host: Some("localhost".into()),
            user: Some("root".into()),
            default_database: Some("appdb".into()),
            ..Default::default()
        });
        let client = MysqlClient::new(server.clone(), None);
        assert_eq!(client.database.as_deref(), Some("appdb"));

        let client = MysqlClient::new(server, Some("other".into()));
        assert_eq!(client.database.as_deref(), Some("other"));
    }

    #[test]
    fn test_operations_require_connect() {
        let server = ServerConfig::wrap(EngineConfig::default());
        let client = MysqlClient::new(server, None);
        assert!(matches!(
            client.pool(),
            Err(DbError::NotConnected { .. })
        ));
    }
}
