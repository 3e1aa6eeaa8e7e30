//! SQL construction and sanitization utilities.
//!
//! Dialect-agnostic statement builders, the literal-escaping helper, the
//! per-engine dialect layer, and the read-only statement classifier.

pub mod changes;
pub mod dialect;
pub mod escape;
pub mod filters;
pub mod readonly;

pub use changes::{
    ChangeSet, RowData, TableColumn, TableDelete, TableInsert, TableUpdate, apply_changes_sql,
    build_delete_queries, build_insert_queries, build_insert_query,
    build_select_queries_from_updates, build_update_queries, join_queries,
};
pub use dialect::{
    ChangeBuilder, DropIndexSpec, MysqlChangeBuilder, PostgresChangeBuilder, SqliteChangeBuilder,
    wrap_identifier, wrap_table,
};
pub use escape::{SqlLiteral, escape_string};
pub use filters::{
    FilterJoin, FilterKind, FilterValue, OrderBy, SelectTopQuery, SortDirection, TableFilter,
    build_database_filter, build_select_top_query,
};
pub use readonly::{PlannedStatement, check_read_only, classify_statement, plan_statements};
