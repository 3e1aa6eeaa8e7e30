//! Error types for the SQL client core.
//!
//! All failure modes are expressed through [`DbError`] using `thiserror`.
//! The registry re-raises client failures after logging; the boundary
//! adapter converts every error into a `{success: false, error}` envelope,
//! so no error value ever crosses the transport boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Required connection fields are absent or malformed.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Driver-level connect failure.
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Connection not found: {connection_id}")]
    NotFound { connection_id: String },

    /// The operation requires a bound client and the connection has none.
    #[error("Connection not connected: {connection_id}")]
    NotConnected { connection_id: String },

    #[error(
        "The database is opened in read-only mode and this query is not allowed: {operation}"
    )]
    ReadOnlyViolation { operation: String },

    #[error("Unsupported database engine: {engine}")]
    UnsupportedEngine { engine: String },

    /// Statement parse or execution failure.
    #[error("SQL error: {message}")]
    Sql {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    /// Connection-store read/write failure.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(connection_id: impl Into<String>) -> Self {
        Self::NotFound {
            connection_id: connection_id.into(),
        }
    }

    /// Create a not-connected error.
    pub fn not_connected(connection_id: impl Into<String>) -> Self {
        Self::NotConnected {
            connection_id: connection_id.into(),
        }
    }

    /// Create a read-only violation for the given statement kind.
    pub fn read_only_violation(operation: impl Into<String>) -> Self {
        Self::ReadOnlyViolation {
            operation: operation.into(),
        }
    }

    /// Create an unsupported-engine error.
    pub fn unsupported_engine(engine: impl Into<String>) -> Self {
        Self::UnsupportedEngine {
            engine: engine.into(),
        }
    }

    /// Create a SQL error with optional SQLSTATE.
    pub fn sql(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Sql {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection configuration and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::sql(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::sql("No rows returned", None),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out acquiring a connection from the pool",
                "Check that the database server is reachable",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::sql(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_validation_display() {
        let err = DbError::validation("Host is required");
        assert!(err.to_string().contains("Host is required"));
    }

    #[test]
    fn test_read_only_display() {
        let err = DbError::read_only_violation("DELETE");
        let msg = err.to_string();
        assert!(msg.contains("read-only"));
        assert!(msg.contains("DELETE"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("Failed", "Check the host");
        assert_eq!(err.suggestion(), Some("Check the host"));
        assert_eq!(DbError::not_found("c1").suggestion(), None);
    }

    #[test]
    fn test_sql_error_carries_state() {
        let err = DbError::sql("syntax error", Some("42601".to_string()));
        match err {
            DbError::Sql { sql_state, .. } => assert_eq!(sql_state.as_deref(), Some("42601")),
            _ => panic!("expected Sql variant"),
        }
    }
}
