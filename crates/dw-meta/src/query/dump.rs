//! Diagnostic dump of every store table.

use crate::error::{MetaError, MetaResult};
use crate::query::adhoc::{list_tables, table_row_count, validate_table_name};
use duckdb::Connection;

/// One table's shape and a sample of its committed rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDump {
    pub name: String,
    pub columns: Vec<String>,
    /// At most the requested number of rows; NULL renders as `"null"`.
    pub rows: Vec<Vec<String>>,
    pub total_rows: i64,
}

/// Dump all `dw_meta` tables with up to `sample_rows` rows each.
///
/// Every value is cast to VARCHAR in SQL so timestamps and booleans render
/// the way DuckDB prints them.
pub fn dump(conn: &Connection, sample_rows: usize) -> MetaResult<Vec<TableDump>> {
    list_tables(conn)?
        .into_iter()
        .map(|table| dump_table(conn, table, sample_rows))
        .collect()
}

fn dump_table(conn: &Connection, name: String, sample_rows: usize) -> MetaResult<TableDump> {
    validate_table_name(&name)?;
    let columns = table_columns(conn, &name)?;
    let total_rows = table_row_count(conn, &name)?;

    let select_list = columns
        .iter()
        .map(|c| format!("CAST(\"{c}\" AS VARCHAR)"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {select_list} FROM dw_meta.{name} LIMIT {sample_rows}");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| MetaError::QueryError(format!("prepare dump of {name}: {e}")))?;
    let width = columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| {
                    row.get::<_, Option<String>>(i)
                        .map(|v| v.unwrap_or_else(|| "null".to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|e| MetaError::QueryError(format!("dump of {name} failed: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MetaError::QueryError(format!("row error in {name}: {e}")))?;

    Ok(TableDump {
        name,
        columns,
        rows,
        total_rows,
    })
}

fn table_columns(conn: &Connection, table: &str) -> MetaResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'dw_meta' AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .map_err(|e| MetaError::QueryError(format!("prepare column listing: {e}")))?;
    let columns = stmt
        .query_map(duckdb::params![table], |row| row.get::<_, String>(0))
        .map_err(|e| MetaError::QueryError(format!("column listing for {table}: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MetaError::QueryError(format!("column listing for {table}: {e}")))?;
    Ok(columns)
}

#[cfg(test)]
#[path = "dump_test.rs"]
mod tests;
