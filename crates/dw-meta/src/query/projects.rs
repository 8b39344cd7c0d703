//! Stored projects overview.

use crate::error::{MetaError, MetaResult};
use duckdb::Connection;

/// A stored project with its current node count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project_name: String,
    pub node_count: i64,
    /// Time of the last successful upsert, as DuckDB renders it
    pub last_ingested_at: Option<String>,
}

/// All stored projects ordered by name.
pub fn list_projects(conn: &Connection) -> MetaResult<Vec<ProjectSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.project_name,
                    (SELECT COUNT(*) FROM dw_meta.node n WHERE n.project_name = p.project_name),
                    (SELECT CAST(i.ingested_at AS VARCHAR) FROM dw_meta.project_ingest i
                      WHERE i.project_name = p.project_name)
             FROM dw_meta.project p
             ORDER BY p.project_name",
        )
        .map_err(|e| MetaError::QueryError(format!("prepare list_projects: {e}")))?;

    let projects = stmt
        .query_map([], |row| {
            Ok(ProjectSummary {
                project_name: row.get(0)?,
                node_count: row.get(1)?,
                last_ingested_at: row.get(2)?,
            })
        })
        .map_err(|e| MetaError::QueryError(format!("list_projects failed: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MetaError::QueryError(format!("list_projects row: {e}")))?;
    Ok(projects)
}
