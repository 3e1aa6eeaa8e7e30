//! Data models for the SQL client core.

pub mod config;
pub mod connection;
pub mod query;

pub use config::{DbSelector, EngineConfig, EngineKind, IncomingConfig, ServerConfig};
pub use connection::{ConnectionDetails, ConnectionSummary, PersistedConnection};
pub use query::{
    FieldDescriptor, QueryResult, RawQueryResult, RawRow, RawValue, TableListOptions, TableRef,
};
