//! Removing stored rows.
//!
//! DuckDB rejects deleting a parent row in the transaction that deleted the
//! rows referencing it, so removal is split into phases that each run in
//! their own transaction:
//!
//! 1. [`clear_project_children`]: config and child rows of every node of a
//!    project.
//! 2. [`prune_detached_nodes`]: node rows of a project left without config.
//! 3. [`drop_project`]: the project row and its last-ingest row.

use crate::error::{MetaResult, MetaResultExt};
use duckdb::{Connection, OptionalExt};

/// Delete statements for the rows hanging off a project's nodes. Each takes
/// the project name. `node` itself is left alone.
const PROJECT_CHILD_DELETE_STMTS: &[&str] = &[
    "DELETE FROM dw_meta.node_columns WHERE node_id IN (SELECT id FROM dw_meta.node WHERE project_name = ?)",
    "DELETE FROM dw_meta.node_references WHERE node_id IN (SELECT id FROM dw_meta.node WHERE project_name = ?)",
    "DELETE FROM dw_meta.node_sources WHERE node_id IN (SELECT id FROM dw_meta.node WHERE project_name = ?)",
    "DELETE FROM dw_meta.dependencies WHERE node_id IN (SELECT id FROM dw_meta.node WHERE project_name = ?)",
    "DELETE FROM dw_meta.config WHERE node_id IN (SELECT id FROM dw_meta.node WHERE project_name = ?)",
];

/// Delete config and child rows of every node of `project`. Returns the
/// number of config rows removed, which is the number of nodes cleared.
pub fn clear_project_children(conn: &Connection, project: &str) -> MetaResult<usize> {
    let mut cleared = 0;
    for stmt in PROJECT_CHILD_DELETE_STMTS {
        cleared = conn
            .execute(stmt, duckdb::params![project])
            .populate_context("clear project children")?;
    }
    Ok(cleared)
}

/// Delete the node rows of `project` that have no config row.
///
/// Every node written by an upsert gets a config row, so after an upsert
/// commits these are exactly the nodes its manifest no longer contains.
/// Must run in a later transaction than the one that cleared their children.
pub fn prune_detached_nodes(conn: &Connection, project: &str) -> MetaResult<usize> {
    conn.execute(
        "DELETE FROM dw_meta.node n
         WHERE n.project_name = ?
           AND NOT EXISTS (SELECT 1 FROM dw_meta.config c WHERE c.node_id = n.id)",
        duckdb::params![project],
    )
    .populate_context("prune detached nodes")
}

/// Delete the project row and its last-ingest row. Returns whether the
/// project was stored.
///
/// Fails while node rows still reference the project.
pub fn drop_project(conn: &Connection, project: &str) -> MetaResult<bool> {
    conn.execute(
        "DELETE FROM dw_meta.project_ingest WHERE project_name = ?",
        duckdb::params![project],
    )
    .populate_context("delete project_ingest")?;
    let removed = conn
        .execute(
            "DELETE FROM dw_meta.project WHERE project_name = ?",
            duckdb::params![project],
        )
        .populate_context("delete project")?;
    Ok(removed > 0)
}

/// Project currently owning `node_id`, if the node is stored.
pub fn node_owner(conn: &Connection, node_id: &str) -> MetaResult<Option<String>> {
    conn.query_row(
        "SELECT project_name FROM dw_meta.node WHERE id = ?",
        duckdb::params![node_id],
        |row| row.get(0),
    )
    .optional()
    .populate_context("select node owner")
}
