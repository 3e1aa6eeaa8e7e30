//! Connection metadata shapes.

use crate::models::config::{EngineKind, ServerConfig};
use serde::{Deserialize, Serialize};

/// Minimal connection summary for listing (no config, no client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "engineKind")]
    pub engine: EngineKind,
    pub connected: bool,
}

/// Full connection metadata. Never carries the client instance; the
/// registry is the sole owner of client lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub id: String,
    pub name: String,
    #[serde(rename = "engineKind")]
    pub engine: EngineKind,
    pub config: ServerConfig,
    pub connected: bool,
}

/// One entry of the persisted connection set. The on-disk file is a JSON
/// array of these; there is no schema version field, so loading is
/// tolerant per entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedConnection {
    pub id: String,
    pub name: String,
    #[serde(rename = "engineKind")]
    pub engine: EngineKind,
    pub config: ServerConfig,
}
