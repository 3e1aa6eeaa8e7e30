//! Read-only policy enforcement against a real SQLite database.
//!
//! The table is created through a writable connection first, then a
//! read-only connection to the same file exercises the policy.

use sqlbridge::models::{EngineConfig, IncomingConfig};
use sqlbridge::{ConnectionRegistry, ConnectionStore, DbError, EngineKind};
use std::path::PathBuf;
use tempfile::TempDir;

fn registry_in(dir: &TempDir) -> ConnectionRegistry {
    ConnectionRegistry::new(ConnectionStore::with_path(
        dir.path().join("connections.json"),
    ))
}

async fn seed_database(dir: &TempDir) -> PathBuf {
    let db_path = dir.path().join("readonly.db");
    let registry = registry_in(dir);
    let id = registry
        .create_connection(
            "seed",
            EngineKind::Sqlite,
            IncomingConfig::Raw(EngineConfig {
                database: Some(db_path.to_string_lossy().into_owned()),
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap();
    registry
        .execute_query(&id, "CREATE TABLE t(id INTEGER); INSERT INTO t VALUES (1)")
        .await
        .unwrap();
    registry.disconnect(&id).await.unwrap();
    db_path
}

async fn read_only_connection(
    registry: &ConnectionRegistry,
    db_path: &PathBuf,
) -> String {
    registry
        .create_connection(
            "ro",
            EngineKind::Sqlite,
            IncomingConfig::Raw(EngineConfig {
                database: Some(db_path.to_string_lossy().into_owned()),
                read_only: true,
                ..Default::default()
            }),
            None,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_read_only_rejects_delete() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seed_database(&dir).await;
    let registry = registry_in(&dir);
    let id = read_only_connection(&registry, &db_path).await;

    let result = registry.execute_query(&id, "DELETE FROM t").await;
    assert!(matches!(result, Err(DbError::ReadOnlyViolation { .. })));

    // The blocked statement never reached the driver
    let select = registry.execute_query(&id, "SELECT * FROM t").await.unwrap();
    assert_eq!(select[0].row_count, 1);
}

#[tokio::test]
async fn test_read_only_rejects_writes_and_ddl() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seed_database(&dir).await;
    let registry = registry_in(&dir);
    let id = read_only_connection(&registry, &db_path).await;

    for sql in [
        "INSERT INTO t VALUES (2)",
        "UPDATE t SET id = 9",
        "DROP TABLE t",
        "CREATE TABLE other(id INTEGER)",
    ] {
        let result = registry.execute_query(&id, sql).await;
        assert!(
            matches!(result, Err(DbError::ReadOnlyViolation { .. })),
            "expected read-only violation for: {sql}"
        );
    }
}

#[tokio::test]
async fn test_read_only_allows_the_safe_statements() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seed_database(&dir).await;
    let registry = registry_in(&dir);
    let id = read_only_connection(&registry, &db_path).await;

    assert!(registry.execute_query(&id, "SELECT * FROM t").await.is_ok());
    assert!(
        registry
            .execute_query(&id, "EXPLAIN SELECT * FROM t")
            .await
            .is_ok()
    );
    assert!(
        registry
            .execute_query(&id, "PRAGMA table_info(t)")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_read_only_rejects_mixed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = seed_database(&dir).await;
    let registry = registry_in(&dir);
    let id = read_only_connection(&registry, &db_path).await;

    let result = registry
        .execute_query(&id, "SELECT * FROM t; DELETE FROM t")
        .await;
    assert!(matches!(result, Err(DbError::ReadOnlyViolation { .. })));

    // Nothing from the batch executed
    let select = registry.execute_query(&id, "SELECT * FROM t").await.unwrap();
    assert_eq!(select[0].row_count, 1);
}
