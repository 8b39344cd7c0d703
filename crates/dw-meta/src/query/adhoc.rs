//! Ad-hoc query execution and table introspection helpers.
//!
//! Returns plain Rust types so callers don't need a direct `duckdb` dependency.

use crate::error::{MetaError, MetaResult};
use crate::query::render::render_value;
use duckdb::types::Value;
use duckdb::Connection;

/// Result of executing an ad-hoc SQL query against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Column names from the result set.
    pub columns: Vec<String>,
    /// Rows of string-coerced values.
    pub rows: Vec<Vec<String>>,
}

/// Execute an ad-hoc SQL query and return all results as strings.
///
/// Values are rendered by [`render_value`], so NULL comes back as `"null"`.
pub fn execute_query(conn: &Connection, sql: &str) -> MetaResult<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| MetaError::QueryError(format!("prepare failed: {e}")))?;
    let mut cursor = stmt
        .query([])
        .map_err(|e| MetaError::QueryError(format!("query failed: {e}")))?;

    // Column metadata exists only once the statement has run.
    let columns = cursor
        .as_ref()
        .map(|executed| executed.column_names())
        .unwrap_or_default();

    let mut rows = Vec::new();
    while let Some(row) = cursor
        .next()
        .map_err(|e| MetaError::QueryError(format!("row error: {e}")))?
    {
        let values = (0..columns.len())
            .map(|i| row.get::<_, Value>(i).map(|v| render_value(&v)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MetaError::QueryError(format!("row error: {e}")))?;
        rows.push(values);
    }
    Ok(QueryResult { columns, rows })
}

/// List all tables in the `dw_meta` schema.
pub fn list_tables(conn: &Connection) -> MetaResult<Vec<String>> {
    let result = execute_query(
        conn,
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'dw_meta' \
         ORDER BY table_name",
    )?;
    Ok(result.rows.into_iter().map(|r| r[0].clone()).collect())
}

/// Reject anything that is not a plain identifier before splicing it into SQL.
pub(crate) fn validate_table_name(table_name: &str) -> MetaResult<()> {
    if table_name.is_empty()
        || !table_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(MetaError::QueryError(format!(
            "invalid table name '{table_name}': must contain only alphanumeric characters and underscores"
        )));
    }
    Ok(())
}

/// Get the row count for a table in the `dw_meta` schema.
pub fn table_row_count(conn: &Connection, table_name: &str) -> MetaResult<i64> {
    validate_table_name(table_name)?;
    conn.query_row(
        &format!("SELECT COUNT(*) FROM dw_meta.{table_name}"),
        [],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::QueryError(format!("count failed for {table_name}: {e}")))
}

#[cfg(test)]
#[path = "adhoc_test.rs"]
mod tests;
