//! Writing manifests into the store.
//!
//! All functions take `&Connection` so callers wrap them in transactions via
//! [`crate::MetaDb::transaction`]; nothing here commits.

pub mod lifecycle;
pub mod nodes;
pub mod project;

use crate::error::{MetaError, MetaResult};
use duckdb::Connection;
use dw_core::Manifest;
use std::collections::BTreeSet;

use self::lifecycle::{clear_project_children, node_owner};
use self::nodes::write_node;
use self::project::{ensure_project, record_ingest};

#[cfg(test)]
#[path = "populate_test.rs"]
mod populate_tests;

/// Row counts written by one upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub nodes: usize,
    pub columns: usize,
    pub references: usize,
    pub sources: usize,
    pub dependencies: usize,
}

/// Replace the config and child rows of the manifest's project with the
/// manifest's content.
///
/// Node rows that survive keep their key and get their attributes rewritten;
/// new nodes are inserted. Nodes missing from the manifest keep their node
/// row but lose their config and children; they are removed afterwards by
/// [`lifecycle::prune_detached_nodes`] in a separate transaction. A node id
/// already stored under another project is rejected.
pub fn upsert_manifest(conn: &Connection, manifest: &Manifest) -> MetaResult<UpsertStats> {
    let project = manifest.project_name();
    ensure_project(conn, project)?;

    let mut stored = BTreeSet::new();
    for (id, _) in manifest.nodes_sorted() {
        match node_owner(conn, id)? {
            Some(owner) if owner == project.as_str() => {
                stored.insert(id);
            }
            Some(owner) => {
                return Err(MetaError::PopulationError(format!(
                    "node '{id}' is already stored under project '{owner}', not '{project}'"
                )));
            }
            None => {}
        }
    }

    let cleared = clear_project_children(conn, project)?;
    log::debug!("Cleared rows of {cleared} previous nodes of project '{project}'");

    let mut stats = UpsertStats::default();
    for (id, node) in manifest.nodes_sorted() {
        let written = write_node(conn, project, id, node, stored.contains(id))?;
        stats.nodes += 1;
        stats.columns += written.columns;
        stats.references += written.references;
        stats.sources += written.sources;
        stats.dependencies += written.dependencies;
    }

    record_ingest(conn, project, stats.nodes)?;
    Ok(stats)
}
