//! Filtered SELECT construction.
//!
//! Builds WHERE clauses from structured filter descriptors and paginated
//! SELECT/COUNT pairs sharing the same clause. Dialect-agnostic: literal
//! values are inlined via [`escape_string`], identifiers are passed
//! through as supplied.

use crate::sql::escape::{SqlLiteral, escape_string};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filter kind. Known comparison shapes are handled structurally; any
/// other string is treated as a raw operator and rendered parameterized
/// (`field <OP> ?`), never inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Between,
    Like,
    NotLike,
    #[serde(untagged)]
    Operator(String),
}

/// Filter value: scalar or array. Scalars are wrapped where an array is
/// expected (IN/NOT IN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Many(Vec<SqlLiteral>),
    One(SqlLiteral),
}

impl FilterValue {
    /// View the value as a list, wrapping a scalar.
    pub fn values(&self) -> Vec<&SqlLiteral> {
        match self {
            Self::Many(values) => values.iter().collect(),
            Self::One(value) => vec![value],
        }
    }
}

impl Default for FilterValue {
    fn default() -> Self {
        Self::One(SqlLiteral::Null)
    }
}

/// One filter condition on a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFilter {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FilterKind,
    #[serde(default)]
    pub value: FilterValue,
}

/// Join strategy for combining multiple filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterJoin {
    #[default]
    And,
    Or,
}

impl FilterJoin {
    fn separator(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Ordering entry: raw text or a field/direction pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderBy {
    Field {
        field: String,
        #[serde(default)]
        direction: SortDirection,
    },
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

fn render_filter(filter: &TableFilter) -> String {
    match &filter.kind {
        FilterKind::IsNull => format!("{} IS NULL", filter.field),
        FilterKind::IsNotNull => format!("{} IS NOT NULL", filter.field),
        FilterKind::In => format!("{} IN ({})", filter.field, escaped_list(&filter.value)),
        FilterKind::NotIn => {
            format!("{} NOT IN ({})", filter.field, escaped_list(&filter.value))
        }
        FilterKind::Between => {
            let values = filter.value.values();
            let low = values
                .first()
                .map(|v| escape_string(v))
                .unwrap_or_else(|| "NULL".to_string());
            let high = values
                .get(1)
                .map(|v| escape_string(v))
                .unwrap_or_else(|| "NULL".to_string());
            format!("{} BETWEEN {} AND {}", filter.field, low, high)
        }
        FilterKind::Like => format!("{} LIKE {}", filter.field, single_value(&filter.value)),
        FilterKind::NotLike => {
            format!("{} NOT LIKE {}", filter.field, single_value(&filter.value))
        }
        FilterKind::Operator(op) => format!("{} {} ?", filter.field, op.to_uppercase()),
    }
}

fn escaped_list(value: &FilterValue) -> String {
    value
        .values()
        .iter()
        .map(|v| escape_string(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn single_value(value: &FilterValue) -> String {
    value
        .values()
        .first()
        .map(|v| escape_string(v))
        .unwrap_or_else(|| "NULL".to_string())
}

/// Build a WHERE clause from filters, joined by the given strategy.
/// Returns an empty string when no filters are supplied.
pub fn build_database_filter(filters: &[TableFilter], join: FilterJoin) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = filters.iter().map(render_filter).collect();
    format!("WHERE {}", rendered.join(join.separator()))
}

/// Parameter values collected for the placeholders of a built query:
/// every non-null filter value, flattened in filter order.
fn collect_params(filters: &[TableFilter]) -> Vec<SqlLiteral> {
    filters
        .iter()
        .flat_map(|f| f.value.values())
        .filter(|v| !v.is_null())
        .cloned()
        .collect()
}

/// A paginated SELECT plus its matching COUNT query.
#[derive(Debug, Clone)]
pub struct SelectTopQuery {
    pub query: String,
    pub count_query: String,
    pub params: Vec<SqlLiteral>,
}

/// Build a paginated SELECT and a COUNT query sharing the same WHERE
/// clause.
#[allow(clippy::too_many_arguments)]
pub fn build_select_top_query(
    table: &str,
    offset: u64,
    limit: u64,
    order_by: &[OrderBy],
    filters: &[TableFilter],
    count_title: &str,
    selects: &[&str],
    join: FilterJoin,
) -> SelectTopQuery {
    debug!(table, offset, limit, "building select top query");

    let order_by_string = if order_by.is_empty() {
        String::new()
    } else {
        let entries: Vec<String> = order_by
            .iter()
            .map(|item| match item {
                OrderBy::Field { field, direction } => format!("{} {}", field, direction),
                OrderBy::Raw(text) => text.clone(),
            })
            .collect();
        format!("ORDER BY {}", entries.join(", "))
    };

    let filter_string = build_database_filter(filters, join);
    let select_string = if selects.is_empty() {
        "*".to_string()
    } else {
        selects.join(", ")
    };

    let mut query = format!("SELECT {} FROM {}", select_string, table);
    for part in [&filter_string, &order_by_string] {
        if !part.is_empty() {
            query.push(' ');
            query.push_str(part);
        }
    }
    query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

    let mut count_query = format!("SELECT COUNT(*) AS {} FROM {}", count_title, table);
    if !filter_string.is_empty() {
        count_query.push(' ');
        count_query.push_str(&filter_string);
    }

    SelectTopQuery {
        query,
        count_query,
        params: collect_params(filters),
    }
}
