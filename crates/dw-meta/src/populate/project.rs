//! Populate the `project` and `project_ingest` tables.

use crate::error::{MetaResult, MetaResultExt};
use duckdb::Connection;
use dw_core::ProjectName;

/// Insert the project row unless it already exists.
pub fn ensure_project(conn: &Connection, project: &ProjectName) -> MetaResult<()> {
    conn.execute(
        "INSERT INTO dw_meta.project (project_name) VALUES (?) ON CONFLICT DO NOTHING",
        duckdb::params![project.as_str()],
    )
    .populate_context("insert project")?;
    Ok(())
}

/// Record the node count and time of the latest upsert, replacing the
/// previous record.
pub fn record_ingest(conn: &Connection, project: &ProjectName, node_count: usize) -> MetaResult<()> {
    conn.execute(
        "INSERT INTO dw_meta.project_ingest (project_name, node_count) VALUES (?, ?)
         ON CONFLICT (project_name) DO UPDATE
         SET node_count = excluded.node_count, ingested_at = now()",
        duckdb::params![project.as_str(), node_count as i64],
    )
    .populate_context("upsert project_ingest")?;
    Ok(())
}
