//! Durable connection metadata storage.
//!
//! The registry persists the full connection set (including credentials;
//! this component is explicitly not designed for credential-at-rest
//! security) to a JSON file under the application's per-user data
//! directory. The file is a plain array with no schema version; loading
//! is tolerant per entry so one malformed record never aborts the rest.

use crate::error::{DbError, DbResult};
use crate::models::PersistedConnection;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "sqlbridge";
const STORE_FILE: &str = "database-connections.json";

#[derive(Debug, Clone)]
pub struct ConnectionStore {
    path: PathBuf,
}

impl ConnectionStore {
    /// Store at the default per-user data directory location.
    pub fn new() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join(APP_DIR).join(STORE_FILE),
        }
    }

    /// Store at an explicit path (host applications and tests).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted connection set. Missing file means an empty
    /// set; malformed entries are skipped with a warning.
    pub async fn load(&self) -> DbResult<Vec<PersistedConnection>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved database connections found");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read saved connections");
                return Ok(Vec::new());
            }
        };

        let raw: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Invalid saved connections file");
                return Ok(Vec::new());
            }
        };

        let entries = match raw.as_array() {
            Some(entries) => entries,
            None => {
                warn!(path = %self.path.display(), "Invalid saved connections format");
                return Ok(Vec::new());
            }
        };

        let mut connections = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<PersistedConnection>(entry.clone()) {
                Ok(connection) => connections.push(connection),
                Err(e) => {
                    warn!(
                        id = %entry.get("id").and_then(|v| v.as_str()).unwrap_or("<unknown>"),
                        error = %e,
                        "Skipping malformed saved connection"
                    );
                }
            }
        }

        info!(count = connections.len(), "Loaded saved database connections");
        Ok(connections)
    }

    /// Write the full connection set. The caller awaits this before
    /// reporting success, so the last completed write wins on crash.
    pub async fn save(&self, connections: &[PersistedConnection]) -> DbResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DbError::persistence(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_vec_pretty(connections)
            .map_err(|e| DbError::persistence(format!("Failed to serialize connections: {}", e)))?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| DbError::persistence(format!("Failed to write {}: {}", self.path.display(), e)))?;

        debug!(count = connections.len(), path = %self.path.display(), "Saved connections to disk");
        Ok(())
    }
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngineConfig, EngineKind, ServerConfig};

    fn entry(id: &str) -> PersistedConnection {
        PersistedConnection {
            id: id.to_string(),
            name: format!("name-{}", id),
            engine: EngineKind::Sqlite,
            config: ServerConfig::wrap(EngineConfig {
                database: Some("/tmp/test.db".into()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::with_path(dir.path().join("none.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConnectionStore::with_path(dir.path().join("connections.json"));
        let saved = vec![entry("a"), entry("b")];
        store.save(&saved).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_malformed_entry_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        let data = serde_json::json!([
            { "id": "good", "name": "n", "engineKind": "sqlite", "config": { "db": {}, "config": {} } },
            { "id": "bad", "engineKind": "nope" },
            "not even an object"
        ]);
        tokio::fs::write(&path, serde_json::to_vec(&data).unwrap())
            .await
            .unwrap();

        let store = ConnectionStore::with_path(&path);
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "good");
    }

    #[tokio::test]
    async fn test_non_array_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connections.json");
        tokio::fs::write(&path, b"{\"oops\": true}").await.unwrap();
        let store = ConnectionStore::with_path(&path);
        assert!(store.load().await.unwrap().is_empty());
    }
}
