//! Connection configuration shapes.
//!
//! The surrounding application supplies either a raw per-database config
//! object or a pre-wrapped server object. Both shapes are accepted at the
//! registry boundary and normalized to the canonical [`ServerConfig`]
//! before a client is ever constructed.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    MySql,
    PostgreSql,
    Sqlite,
}

impl EngineKind {
    /// Parse an engine kind from its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgresql" | "postgres" => Some(Self::PostgreSql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Get the display name for this engine.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::PostgreSql => "PostgreSQL",
            Self::Sqlite => "SQLite",
        }
    }

    /// Get the default port, if the engine is network-based.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySql => Some(3306),
            Self::PostgreSql => Some(5432),
            Self::Sqlite => None,
        }
    }

    /// Whether the engine connects over the network (as opposed to a file).
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Sqlite)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = crate::error::DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::DbError::unsupported_engine(s))
    }
}

/// Raw per-database configuration as supplied by the application.
///
/// For the network engines `host`/`user` are required (validated by the
/// registry); for SQLite `database` carries the database file path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Persisted as-is; this component is not designed for
    /// credential-at-rest security.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,
    /// Database file path for SQLite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl EngineConfig {
    /// A copy safe to include in diagnostics: the credential is masked.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "****".to_string()),
            ..self.clone()
        }
    }
}

/// The canonical server-wrapper shape every client constructor expects:
/// a per-database map (unused by this core, kept for shape compatibility)
/// plus the nested engine config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub db: serde_json::Map<String, JsonValue>,
    pub config: EngineConfig,
}

impl ServerConfig {
    /// Wrap a raw engine config into the canonical shape.
    pub fn wrap(config: EngineConfig) -> Self {
        Self {
            db: serde_json::Map::new(),
            config,
        }
    }
}

/// Incoming config: either the canonical wrapper or a raw engine config.
/// Resolved to [`ServerConfig`] at the registry boundary, never passed
/// ambiguously into client constructors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingConfig {
    Wrapped(ServerConfig),
    Raw(EngineConfig),
}

impl IncomingConfig {
    /// Normalize to the canonical server-wrapper shape.
    pub fn normalize(self) -> ServerConfig {
        match self {
            Self::Wrapped(server) => server,
            Self::Raw(config) => ServerConfig::wrap(config),
        }
    }
}

/// Optional database selector accompanying create-connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbSelector {
    #[serde(default)]
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EngineKind::PostgreSql).unwrap(),
            "\"postgresql\""
        );
        assert_eq!(serde_json::to_string(&EngineKind::MySql).unwrap(), "\"mysql\"");
        assert_eq!(
            serde_json::from_str::<EngineKind>("\"sqlite\"").unwrap(),
            EngineKind::Sqlite
        );
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!(EngineKind::parse("mysql"), Some(EngineKind::MySql));
        assert_eq!(EngineKind::parse("postgres"), Some(EngineKind::PostgreSql));
        assert_eq!(EngineKind::parse("oracle"), None);
    }

    #[test]
    fn test_engine_kind_from_str_rejects_unknown() {
        use crate::error::DbError;
        use std::str::FromStr;
        assert_eq!(EngineKind::from_str("sqlite").unwrap(), EngineKind::Sqlite);
        assert!(matches!(
            EngineKind::from_str("mongodb"),
            Err(DbError::UnsupportedEngine { .. })
        ));
    }

    #[test]
    fn test_raw_config_normalizes_to_wrapper() {
        let raw: IncomingConfig = serde_json::from_value(serde_json::json!({
            "host": "localhost",
            "user": "root",
            "port": 3306
        }))
        .unwrap();
        let server = raw.normalize();
        assert!(server.db.is_empty());
        assert_eq!(server.config.host.as_deref(), Some("localhost"));
        assert_eq!(server.config.user.as_deref(), Some("root"));
    }

    #[test]
    fn test_wrapped_config_passes_through() {
        let wrapped: IncomingConfig = serde_json::from_value(serde_json::json!({
            "db": {},
            "config": { "host": "db.internal", "user": "app" }
        }))
        .unwrap();
        let server = wrapped.normalize();
        assert_eq!(server.config.host.as_deref(), Some("db.internal"));
    }

    #[test]
    fn test_both_shapes_yield_same_canonical_form() {
        let config = EngineConfig {
            host: Some("h".into()),
            user: Some("u".into()),
            ..Default::default()
        };
        let from_raw = IncomingConfig::Raw(config.clone()).normalize();
        let from_wrapped = IncomingConfig::Wrapped(ServerConfig::wrap(config)).normalize();
        assert_eq!(from_raw, from_wrapped);
    }

    #[test]
    fn test_redacted_masks_password() {
        let config = EngineConfig {
            host: Some("h".into()),
            password: Some("hunter2".into()),
            ..Default::default()
        };
        let redacted = config.redacted();
        assert_eq!(redacted.password.as_deref(), Some("****"));
        assert_eq!(redacted.host.as_deref(), Some("h"));
    }
}
