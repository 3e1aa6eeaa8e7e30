//! Persistence round-trip tests: connections survive a simulated restart
//! as disconnected entries with identical metadata, and reconnect derives
//! a fresh client from the stored config.

use sqlbridge::models::{EngineConfig, IncomingConfig};
use sqlbridge::{ConnectionRegistry, ConnectionStore, DbError, EngineKind};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> ConnectionStore {
    ConnectionStore::with_path(dir.path().join("connections.json"))
}

async fn create_sqlite(registry: &ConnectionRegistry, dir: &TempDir, name: &str) -> String {
    let db_path = dir.path().join(format!("{name}.db"));
    registry
        .create_connection(
            name,
            EngineKind::Sqlite,
            IncomingConfig::Raw(EngineConfig {
                database: Some(db_path.to_string_lossy().into_owned()),
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_restart_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let ids = {
        let registry = ConnectionRegistry::new(store_in(&dir));
        let mut ids = Vec::new();
        for name in ["one", "two", "three"] {
            ids.push(create_sqlite(&registry, &dir, name).await);
        }
        ids
    };

    // Simulated restart: a fresh registry over the same store
    let registry = ConnectionRegistry::new(store_in(&dir));
    registry.load_saved_connections().await.unwrap();

    let connections = registry.get_all_connections().await;
    assert_eq!(connections.len(), 3);
    for id in &ids {
        let details = registry.get_connection(id).await.unwrap();
        assert!(!details.connected, "restored connections start disconnected");
        assert_eq!(details.engine, EngineKind::Sqlite);
        assert!(details.config.config.database.is_some());
    }

    // Disconnected entries reject queries
    let result = registry.execute_query(&ids[0], "SELECT 1").await;
    assert!(matches!(result, Err(DbError::NotConnected { .. })));
}

#[tokio::test]
async fn test_reconnect_after_restart() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let registry = ConnectionRegistry::new(store_in(&dir));
        let id = create_sqlite(&registry, &dir, "revive").await;
        registry
            .execute_query(&id, "CREATE TABLE t(id INTEGER); INSERT INTO t VALUES (7)")
            .await
            .unwrap();
        id
    };

    let registry = ConnectionRegistry::new(store_in(&dir));
    registry.load_saved_connections().await.unwrap();

    registry.reconnect(&id).await.unwrap();
    let details = registry.get_connection(&id).await.unwrap();
    assert!(details.connected);

    let select = registry.execute_query(&id, "SELECT * FROM t").await.unwrap();
    assert_eq!(select[0].rows[0]["id"], 7);

    // Reconnecting again is a no-op
    registry.reconnect(&id).await.unwrap();
}

#[tokio::test]
async fn test_reconnect_failure_leaves_clean_disconnected_state() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let registry = ConnectionRegistry::new(store_in(&dir));
        create_sqlite(&registry, &dir, "doomed").await
    };

    // Make the stored file path unusable: replace it with a directory
    tokio::fs::remove_file(dir.path().join("doomed.db"))
        .await
        .unwrap();
    tokio::fs::create_dir(dir.path().join("doomed.db"))
        .await
        .unwrap();

    let registry = ConnectionRegistry::new(store_in(&dir));
    registry.load_saved_connections().await.unwrap();

    let result = registry.reconnect(&id).await;
    assert!(result.is_err());

    let details = registry.get_connection(&id).await.unwrap();
    assert!(!details.connected);

    // Still queryable-as-absent, not half-bound
    let result = registry.execute_query(&id, "SELECT 1").await;
    assert!(matches!(result, Err(DbError::NotConnected { .. })));
}

#[tokio::test]
async fn test_disconnect_persists_removal() {
    let dir = tempfile::tempdir().unwrap();

    {
        let registry = ConnectionRegistry::new(store_in(&dir));
        let keep = create_sqlite(&registry, &dir, "keep").await;
        let drop_id = create_sqlite(&registry, &dir, "drop").await;
        registry.disconnect(&drop_id).await.unwrap();
        assert!(registry.get_connection(&keep).await.is_some());
    }

    let registry = ConnectionRegistry::new(store_in(&dir));
    registry.load_saved_connections().await.unwrap();
    let connections = registry.get_all_connections().await;
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].name, "keep");
}

#[tokio::test]
async fn test_validation_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ConnectionRegistry::new(store_in(&dir));

    let result = registry
        .create_connection(
            "bad",
            EngineKind::MySql,
            IncomingConfig::Raw(EngineConfig::default()),
            None,
        )
        .await;
    assert!(matches!(result, Err(DbError::Validation { .. })));
    assert!(!dir.path().join("connections.json").exists());
}
