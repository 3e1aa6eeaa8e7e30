//! Process-wide connection registry.
//!
//! Owns the id-to-connection table, the active-connection pointer, client
//! lifetimes, and durable persistence of connection metadata. Constructed
//! once at process start and passed by reference to the boundary adapter;
//! there is no implicit global instance.
//!
//! All state lives behind one async mutex held across connect and
//! disconnect awaits, so mutations for a given connection id cannot
//! interleave.

use crate::client::Client;
use crate::error::{DbError, DbResult};
use crate::models::{
    ConnectionDetails, ConnectionSummary, DbSelector, EngineConfig, EngineKind, IncomingConfig,
    PersistedConnection, QueryResult, ServerConfig, TableListOptions, TableRef,
};
use crate::sanitize::sanitize_result;
use crate::store::ConnectionStore;
use std::collections::HashMap;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Notifications emitted by the registry, in the order the operations
/// complete. Delivery is best-effort; nothing in the registry depends on
/// a listener being present.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    ConnectionCreated { id: String },
    ConnectionClosed { id: String },
    ConnectionReconnected { id: String },
    ActiveConnectionChanged { id: String },
}

/// One registry entry. Invariant: `connected` implies `client.is_some()`.
struct Connection {
    id: String,
    name: String,
    engine: EngineKind,
    config: ServerConfig,
    connected: bool,
    client: Option<Client>,
}

impl Connection {
    fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            engine: self.engine,
            connected: self.connected,
        }
    }

    fn details(&self) -> ConnectionDetails {
        ConnectionDetails {
            id: self.id.clone(),
            name: self.name.clone(),
            engine: self.engine,
            config: self.config.clone(),
            connected: self.connected,
        }
    }

    fn persisted(&self) -> PersistedConnection {
        PersistedConnection {
            id: self.id.clone(),
            name: self.name.clone(),
            engine: self.engine,
            config: self.config.clone(),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<String, Connection>,
    active_id: Option<String>,
}

pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
    store: ConnectionStore,
    events: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    pub fn new(store: ConnectionStore) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: Mutex::new(RegistryState::default()),
            store,
            events,
        }
    }

    /// Subscribe to registry notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        let _ = self.events.send(event);
    }

    /// Restore previously created connections from disk. Entries load
    /// disconnected regardless of their prior state; the user connects
    /// explicitly.
    pub async fn load_saved_connections(&self) -> DbResult<()> {
        let entries = self.store.load().await?;
        let mut state = self.state.lock().await;
        for entry in entries {
            state.connections.insert(
                entry.id.clone(),
                Connection {
                    id: entry.id,
                    name: entry.name,
                    engine: entry.engine,
                    config: entry.config,
                    connected: false,
                    client: None,
                },
            );
        }
        info!(
            count = state.connections.len(),
            "Restored saved database connections"
        );
        Ok(())
    }

    /// Create a connection: validate, normalize the config, build the
    /// matching client, connect, store, and persist.
    pub async fn create_connection(
        &self,
        name: &str,
        engine: EngineKind,
        config: IncomingConfig,
        selector: Option<DbSelector>,
    ) -> DbResult<String> {
        let server = config.normalize();
        validate_config(engine, &server.config, selector.as_ref())?;

        let id = format!("conn_{}", Uuid::new_v4().simple());
        let database = selector
            .and_then(|s| s.database)
            .filter(|d| !d.is_empty());
        let mut client = Client::new(engine, server.clone(), database.clone());

        let mut state = self.state.lock().await;

        info!(
            id = %id,
            name = %name,
            engine = %engine,
            database = ?database,
            "Attempting database connect"
        );
        if let Err(e) = client.connect().await {
            // Snapshot for diagnostics, credentials redacted
            error!(
                id = %id,
                name = %name,
                engine = %engine,
                config = ?server.config.redacted(),
                error = %e,
                "Failed to create database connection"
            );
            return Err(e);
        }

        state.connections.insert(
            id.clone(),
            Connection {
                id: id.clone(),
                name: name.to_string(),
                engine,
                config: server,
                connected: true,
                client: Some(client),
            },
        );
        self.emit(RegistryEvent::ConnectionCreated { id: id.clone() });
        self.persist(&state).await;
        Ok(id)
    }

    /// Close and forget a connection entirely, including its persisted
    /// entry. Removal rather than a status flip is the intended
    /// semantics; deleting is the same operation.
    pub async fn disconnect(&self, connection_id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let mut connection = state
            .connections
            .remove(connection_id)
            .ok_or_else(|| DbError::not_found(connection_id))?;

        if let Some(mut client) = connection.client.take() {
            client.disconnect().await?;
        }

        self.emit(RegistryEvent::ConnectionClosed {
            id: connection_id.to_string(),
        });
        self.persist(&state).await;
        info!(id = %connection_id, "Connection closed and removed");
        Ok(())
    }

    /// Re-derive a fresh client from the stored config and connect it.
    /// A no-op when already connected. The old client is never
    /// resurrected; failure leaves the entry cleanly disconnected.
    pub async fn reconnect(&self, connection_id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let connection = state
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| DbError::not_found(connection_id))?;

        if connection.connected && connection.client.is_some() {
            debug!(id = %connection_id, "Connection already connected");
            return Ok(());
        }

        let mut client = Client::new(connection.engine, connection.config.clone(), None);
        info!(
            id = %connection_id,
            name = %connection.name,
            engine = %connection.engine,
            "Attempting database reconnect"
        );

        match client.connect().await {
            Ok(()) => {
                connection.client = Some(client);
                connection.connected = true;
                self.emit(RegistryEvent::ConnectionReconnected {
                    id: connection_id.to_string(),
                });
                info!(id = %connection_id, "Reconnect successful");
                Ok(())
            }
            Err(e) => {
                connection.connected = false;
                connection.client = None;
                error!(
                    id = %connection_id,
                    name = %connection.name,
                    engine = %connection.engine,
                    error = %e,
                    "Failed to reconnect"
                );
                Err(e)
            }
        }
    }

    /// Execute statement text on a connection and sanitize every row for
    /// transport. A failed statement leaves the connection's status
    /// untouched.
    pub async fn execute_query(
        &self,
        connection_id: &str,
        sql: &str,
    ) -> DbResult<Vec<QueryResult>> {
        let state = self.state.lock().await;
        let connection = state
            .connections
            .get(connection_id)
            .ok_or_else(|| DbError::not_found(connection_id))?;
        let client = connection
            .client
            .as_ref()
            .ok_or_else(|| DbError::not_connected(connection_id))?;

        let raw = client.execute_query(sql).await?;
        let sanitized: Vec<QueryResult> = raw.iter().map(sanitize_result).collect();

        // Diagnostics only; a serialization hiccup here must never abort
        // the response
        let summary: Vec<String> = sanitized
            .iter()
            .map(|r| format!("{} rows={} affected={}", r.command, r.row_count, r.affected_rows))
            .collect();
        let sample = sanitized
            .first()
            .map(|r| {
                serde_json::to_string(&r.rows.iter().take(5).collect::<Vec<_>>())
                    .unwrap_or_else(|_| "<unserializable>".to_string())
            })
            .unwrap_or_default();
        debug!(
            id = %connection_id,
            query = %sql,
            summary = ?summary,
            sample = %sample,
            "Query executed"
        );

        Ok(sanitized)
    }

    pub async fn list_databases(&self, connection_id: &str) -> DbResult<Vec<String>> {
        let state = self.state.lock().await;
        let connection = state
            .connections
            .get(connection_id)
            .ok_or_else(|| DbError::not_found(connection_id))?;
        let client = connection
            .client
            .as_ref()
            .ok_or_else(|| DbError::not_connected(connection_id))?;
        client.list_databases().await
    }

    pub async fn list_tables(
        &self,
        connection_id: &str,
        opts: &TableListOptions,
    ) -> DbResult<Vec<TableRef>> {
        let state = self.state.lock().await;
        let connection = state
            .connections
            .get(connection_id)
            .ok_or_else(|| DbError::not_found(connection_id))?;
        let client = connection
            .client
            .as_ref()
            .ok_or_else(|| DbError::not_connected(connection_id))?;
        client.list_tables(opts).await
    }

    /// Full metadata for one connection (never the client).
    pub async fn get_connection(&self, connection_id: &str) -> Option<ConnectionDetails> {
        let state = self.state.lock().await;
        state.connections.get(connection_id).map(Connection::details)
    }

    /// Minimal summaries for every connection: id, name, engine,
    /// connected. Config and client never leave the registry this way.
    pub async fn get_all_connections(&self) -> Vec<ConnectionSummary> {
        let state = self.state.lock().await;
        state.connections.values().map(Connection::summary).collect()
    }

    pub async fn set_active_connection(&self, connection_id: &str) {
        {
            let mut state = self.state.lock().await;
            state.active_id = Some(connection_id.to_string());
        }
        self.emit(RegistryEvent::ActiveConnectionChanged {
            id: connection_id.to_string(),
        });
    }

    pub async fn get_active_connection(&self) -> Option<ConnectionDetails> {
        let state = self.state.lock().await;
        let active_id = state.active_id.as_ref()?;
        state.connections.get(active_id).map(Connection::details)
    }

    async fn persist(&self, state: &RegistryState) {
        let snapshot: Vec<PersistedConnection> =
            state.connections.values().map(Connection::persisted).collect();
        // The snapshot write is awaited before the operation reports
        // success; a write failure is logged, not raised, so it cannot
        // mask the operation's own outcome.
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(error = %e, "Failed to persist connection set");
        }
    }
}

fn validate_config(
    engine: EngineKind,
    config: &EngineConfig,
    selector: Option<&DbSelector>,
) -> DbResult<()> {
    if engine.is_network() {
        if config.host.as_deref().is_none_or(str::is_empty) {
            return Err(DbError::validation(
                "Host is required for MySQL/PostgreSQL connections",
            ));
        }
        if config.user.as_deref().is_none_or(str::is_empty) {
            return Err(DbError::validation(
                "Username is required for MySQL/PostgreSQL connections",
            ));
        }
    } else {
        let has_config_path = config.database.as_deref().is_some_and(|d| !d.is_empty());
        let has_selector_path = selector
            .and_then(|s| s.database.as_deref())
            .is_some_and(|d| !d.is_empty());
        if !has_config_path && !has_selector_path {
            return Err(DbError::validation(
                "Database file path is required for SQLite connections",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry(dir: &tempfile::TempDir) -> ConnectionRegistry {
        ConnectionRegistry::new(ConnectionStore::with_path(
            dir.path().join("connections.json"),
        ))
    }

    #[tokio::test]
    async fn test_create_mysql_without_host_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let result = registry
            .create_connection(
                "bad",
                EngineKind::MySql,
                IncomingConfig::Raw(EngineConfig {
                    user: Some("root".into()),
                    ..Default::default()
                }),
                None,
            )
            .await;
        assert!(matches!(result, Err(DbError::Validation { .. })));
        // No persistence write happened
        assert!(!dir.path().join("connections.json").exists());
    }

    #[tokio::test]
    async fn test_create_postgres_without_user_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let result = registry
            .create_connection(
                "bad",
                EngineKind::PostgreSql,
                IncomingConfig::Raw(EngineConfig {
                    host: Some("localhost".into()),
                    ..Default::default()
                }),
                None,
            )
            .await;
        assert!(matches!(result, Err(DbError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_sqlite_without_path_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let result = registry
            .create_connection(
                "bad",
                EngineKind::Sqlite,
                IncomingConfig::Raw(EngineConfig::default()),
                None,
            )
            .await;
        assert!(matches!(result, Err(DbError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_sqlite_path_via_selector_passes_validation() {
        // Selector-supplied path satisfies validation and reaches connect
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let db_path = dir.path().join("sel.db");
        let result = registry
            .create_connection(
                "sel",
                EngineKind::Sqlite,
                IncomingConfig::Raw(EngineConfig::default()),
                Some(DbSelector {
                    database: Some(db_path.to_string_lossy().into_owned()),
                }),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_id_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        assert!(matches!(
            registry.disconnect("nope").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            registry.reconnect("nope").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            registry.execute_query("nope", "SELECT 1").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(registry.get_connection("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_active_connection_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        assert!(registry.get_active_connection().await.is_none());
        // Pointer to an unknown id resolves to no connection
        registry.set_active_connection("ghost").await;
        assert!(registry.get_active_connection().await.is_none());
    }

    #[tokio::test]
    async fn test_events_emitted_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let mut events = registry.subscribe();
        let db_path = dir.path().join("ev.db");
        let id = registry
            .create_connection(
                "ev",
                EngineKind::Sqlite,
                IncomingConfig::Raw(EngineConfig {
                    database: Some(db_path.to_string_lossy().into_owned()),
                    ..Default::default()
                }),
                None,
            )
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            RegistryEvent::ConnectionCreated { id: event_id } => assert_eq!(event_id, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
