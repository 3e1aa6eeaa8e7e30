//! Per-engine database clients.
//!
//! Each client owns exactly one sqlx pool built from the canonical
//! server-wrapper config plus an optional selected-database override. The
//! [`DatabaseClient`] trait is the five-operation capability contract;
//! [`Client`] is the closed-enum dispatch over the concrete
//! implementations (one per engine), so no runtime type inspection is
//! ever needed.

pub mod decode;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::error::DbResult;
use crate::models::{EngineKind, RawQueryResult, ServerConfig, TableListOptions, TableRef};
use std::time::Duration;

pub use mysql::MysqlClient;
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;

pub(crate) const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub(crate) const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub(crate) const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub(crate) const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// The capability set every engine client satisfies.
#[allow(async_fn_in_trait)]
pub trait DatabaseClient {
    /// Open the underlying pool. Safe to call again on an already
    /// connected instance (no-op).
    async fn connect(&mut self) -> DbResult<()>;

    /// Close the underlying pool. The instance keeps its configuration
    /// but loses the pool.
    async fn disconnect(&mut self) -> DbResult<()>;

    /// Execute arbitrary statement text, one fully materialized result
    /// per statement. Read-only enforcement happens before anything
    /// reaches the driver.
    async fn execute_query(&self, sql: &str) -> DbResult<Vec<RawQueryResult>>;

    /// List database names visible on the target.
    async fn list_databases(&self) -> DbResult<Vec<String>>;

    /// List tables, honoring the database/schema selectors where the
    /// engine supports them.
    async fn list_tables(&self, opts: &TableListOptions) -> DbResult<Vec<TableRef>>;
}

/// Closed dispatch over the concrete engine clients.
#[derive(Debug)]
pub enum Client {
    MySql(MysqlClient),
    Postgres(PostgresClient),
    Sqlite(SqliteClient),
}

impl Client {
    /// Build the matching client for an engine kind. The server config
    /// must already be in canonical wrapper form.
    pub fn new(engine: EngineKind, server: ServerConfig, database: Option<String>) -> Self {
        match engine {
            EngineKind::MySql => Self::MySql(MysqlClient::new(server, database)),
            EngineKind::PostgreSql => Self::Postgres(PostgresClient::new(server, database)),
            EngineKind::Sqlite => Self::Sqlite(SqliteClient::new(server, database)),
        }
    }

    pub fn engine(&self) -> EngineKind {
        match self {
            Self::MySql(_) => EngineKind::MySql,
            Self::Postgres(_) => EngineKind::PostgreSql,
            Self::Sqlite(_) => EngineKind::Sqlite,
        }
    }

    /// Server version reported at connect time, if any.
    pub fn server_version(&self) -> Option<&str> {
        match self {
            Self::MySql(c) => c.server_version(),
            Self::Postgres(c) => c.server_version(),
            Self::Sqlite(c) => c.server_version(),
        }
    }

    pub async fn connect(&mut self) -> DbResult<()> {
        match self {
            Self::MySql(c) => c.connect().await,
            Self::Postgres(c) => c.connect().await,
            Self::Sqlite(c) => c.connect().await,
        }
    }

    pub async fn disconnect(&mut self) -> DbResult<()> {
        match self {
            Self::MySql(c) => c.disconnect().await,
            Self::Postgres(c) => c.disconnect().await,
            Self::Sqlite(c) => c.disconnect().await,
        }
    }

    pub async fn execute_query(&self, sql: &str) -> DbResult<Vec<RawQueryResult>> {
        match self {
            Self::MySql(c) => c.execute_query(sql).await,
            Self::Postgres(c) => c.execute_query(sql).await,
            Self::Sqlite(c) => c.execute_query(sql).await,
        }
    }

    pub async fn list_databases(&self) -> DbResult<Vec<String>> {
        match self {
            Self::MySql(c) => c.list_databases().await,
            Self::Postgres(c) => c.list_databases().await,
            Self::Sqlite(c) => c.list_databases().await,
        }
    }

    pub async fn list_tables(&self, opts: &TableListOptions) -> DbResult<Vec<TableRef>> {
        match self {
            Self::MySql(c) => c.list_tables(opts).await,
            Self::Postgres(c) => c.list_tables(opts).await,
            Self::Sqlite(c) => c.list_tables(opts).await,
        }
    }
}

/// Generate a helpful suggestion for connection errors.
pub(crate) fn connection_suggestion(engine: EngineKind, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", engine);
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password in the connection settings".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match engine {
        EngineKind::PostgreSql => {
            "Verify the host, port, user, and database settings".to_string()
        }
        EngineKind::MySql => "Verify the host, port, and user settings".to_string(),
        EngineKind::Sqlite => {
            "Verify the database file path exists and is accessible".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineConfig;

    #[test]
    fn test_client_dispatch_by_engine() {
        let server = ServerConfig::wrap(EngineConfig::default());
        let client = Client::new(EngineKind::MySql, server.clone(), None);
        assert_eq!(client.engine(), EngineKind::MySql);
        let client = Client::new(EngineKind::Sqlite, server, None);
        assert_eq!(client.engine(), EngineKind::Sqlite);
    }
}
