//! Embedded multi-dialect SQL client core.
//!
//! Connects a desktop application to MySQL, PostgreSQL, and SQLite
//! databases through one uniform interface: a process-wide connection
//! registry, one client per engine, statement builders with a single
//! literal-escaping source of truth, read-only-policy enforcement, and a
//! boundary adapter that sanitizes results for transport.

pub mod adapter;
pub mod client;
pub mod error;
pub mod models;
pub mod registry;
pub mod sanitize;
pub mod sql;
pub mod store;

pub use adapter::{BoundaryAdapter, Request};
pub use client::{Client, DatabaseClient};
pub use error::{DbError, DbResult};
pub use models::{EngineConfig, EngineKind, IncomingConfig, ServerConfig};
pub use registry::{ConnectionRegistry, RegistryEvent};
pub use store::ConnectionStore;
