//! Boundary adapter.
//!
//! The request/response surface the surrounding application talks to.
//! Handlers invoke the registry and convert every error into a
//! `{success: false, error}` envelope; no error value and no raw driver
//! data ever crosses this boundary.

use crate::error::DbError;
use crate::models::{DbSelector, EngineKind, IncomingConfig, TableListOptions};
use crate::registry::ConnectionRegistry;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::error;

/// A boundary request, tagged by operation name.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Request {
    CreateConnection {
        name: String,
        #[serde(rename = "engineKind")]
        engine: EngineKind,
        config: IncomingConfig,
        #[serde(default)]
        database: Option<DbSelector>,
    },
    Disconnect {
        connection_id: String,
    },
    Reconnect {
        connection_id: String,
    },
    ExecuteQuery {
        connection_id: String,
        query: String,
    },
    GetConnections,
    GetConnection {
        connection_id: String,
    },
    SetActiveConnection {
        connection_id: String,
    },
    GetActiveConnection,
    ListDatabases {
        connection_id: String,
    },
    ListTables {
        connection_id: String,
        #[serde(default)]
        database: Option<String>,
        #[serde(default)]
        schema: Option<String>,
    },
}

pub struct BoundaryAdapter {
    registry: Arc<ConnectionRegistry>,
}

impl BoundaryAdapter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Route one request to its handler.
    pub async fn dispatch(&self, request: Request) -> JsonValue {
        match request {
            Request::CreateConnection {
                name,
                engine,
                config,
                database,
            } => self.create_connection(&name, engine, config, database).await,
            Request::Disconnect { connection_id } => self.disconnect(&connection_id).await,
            Request::Reconnect { connection_id } => self.reconnect(&connection_id).await,
            Request::ExecuteQuery {
                connection_id,
                query,
            } => self.execute_query(&connection_id, &query).await,
            Request::GetConnections => self.get_connections().await,
            Request::GetConnection { connection_id } => self.get_connection(&connection_id).await,
            Request::SetActiveConnection { connection_id } => {
                self.set_active_connection(&connection_id).await
            }
            Request::GetActiveConnection => self.get_active_connection().await,
            Request::ListDatabases { connection_id } => self.list_databases(&connection_id).await,
            Request::ListTables {
                connection_id,
                database,
                schema,
            } => self.list_tables(&connection_id, database, schema).await,
        }
    }

    pub async fn create_connection(
        &self,
        name: &str,
        engine: EngineKind,
        config: IncomingConfig,
        database: Option<DbSelector>,
    ) -> JsonValue {
        match self
            .registry
            .create_connection(name, engine, config, database)
            .await
        {
            Ok(connection_id) => json!({ "success": true, "connectionId": connection_id }),
            Err(e) => {
                error!(error = %e, "Error creating database connection");
                failure(e)
            }
        }
    }

    pub async fn disconnect(&self, connection_id: &str) -> JsonValue {
        match self.registry.disconnect(connection_id).await {
            Ok(()) => json!({ "success": true }),
            Err(e) => failure(e),
        }
    }

    pub async fn reconnect(&self, connection_id: &str) -> JsonValue {
        match self.registry.reconnect(connection_id).await {
            Ok(()) => json!({ "success": true }),
            Err(e) => failure(e),
        }
    }

    pub async fn execute_query(&self, connection_id: &str, query: &str) -> JsonValue {
        match self.registry.execute_query(connection_id, query).await {
            Ok(result) => json!({ "success": true, "result": result }),
            Err(e) => failure(e),
        }
    }

    pub async fn get_connections(&self) -> JsonValue {
        serde_json::to_value(self.registry.get_all_connections().await)
            .unwrap_or_else(|_| json!([]))
    }

    pub async fn get_connection(&self, connection_id: &str) -> JsonValue {
        match self.registry.get_connection(connection_id).await {
            Some(details) => serde_json::to_value(details).unwrap_or(JsonValue::Null),
            None => JsonValue::Null,
        }
    }

    pub async fn set_active_connection(&self, connection_id: &str) -> JsonValue {
        self.registry.set_active_connection(connection_id).await;
        json!({ "success": true })
    }

    pub async fn get_active_connection(&self) -> JsonValue {
        match self.registry.get_active_connection().await {
            Some(details) => serde_json::to_value(details).unwrap_or(JsonValue::Null),
            None => JsonValue::Null,
        }
    }

    pub async fn list_databases(&self, connection_id: &str) -> JsonValue {
        match self.registry.list_databases(connection_id).await {
            Ok(databases) => json!({ "success": true, "databases": databases }),
            Err(e) => failure(e),
        }
    }

    pub async fn list_tables(
        &self,
        connection_id: &str,
        database: Option<String>,
        schema: Option<String>,
    ) -> JsonValue {
        let opts = TableListOptions { database, schema };
        match self.registry.list_tables(connection_id, &opts).await {
            Ok(tables) => json!({ "success": true, "tables": tables }),
            Err(e) => failure(e),
        }
    }
}

fn failure(error: DbError) -> JsonValue {
    json!({ "success": false, "error": error.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConnectionStore;

    fn test_adapter(dir: &tempfile::TempDir) -> BoundaryAdapter {
        let store = ConnectionStore::with_path(dir.path().join("connections.json"));
        BoundaryAdapter::new(Arc::new(ConnectionRegistry::new(store)))
    }

    #[tokio::test]
    async fn test_errors_become_envelopes() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = test_adapter(&dir);
        let response = adapter.disconnect("missing").await;
        assert_eq!(response["success"], false);
        assert!(
            response["error"]
                .as_str()
                .unwrap()
                .contains("Connection not found")
        );
    }

    #[tokio::test]
    async fn test_get_connection_unknown_is_null() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = test_adapter(&dir);
        assert_eq!(adapter.get_connection("missing").await, JsonValue::Null);
    }

    #[tokio::test]
    async fn test_get_connections_is_plain_array() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = test_adapter(&dir);
        assert!(adapter.get_connections().await.is_array());
    }

    #[tokio::test]
    async fn test_dispatch_create_connection_request() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = test_adapter(&dir);
        let db_path = dir.path().join("disp.db");
        let request: Request = serde_json::from_value(json!({
            "op": "create-connection",
            "name": "local",
            "engineKind": "sqlite",
            "config": { "database": db_path.to_string_lossy() }
        }))
        .unwrap();
        let response = adapter.dispatch(request).await;
        assert_eq!(response["success"], true);
        assert!(response["connectionId"].as_str().unwrap().starts_with("conn_"));
    }

    #[tokio::test]
    async fn test_dispatch_validation_failure_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = test_adapter(&dir);
        let request: Request = serde_json::from_value(json!({
            "op": "create-connection",
            "name": "bad",
            "engineKind": "mysql",
            "config": {}
        }))
        .unwrap();
        let response = adapter.dispatch(request).await;
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("Host is required"));
    }
}
