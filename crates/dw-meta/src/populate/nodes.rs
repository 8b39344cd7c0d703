//! Populate the `node`, `config`, and per-node child tables.

use crate::error::{MetaResult, MetaResultExt};
use duckdb::Connection;
use dw_core::{Node, NodeId, ProjectName};

/// Child rows written for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRows {
    pub columns: usize,
    pub references: usize,
    pub sources: usize,
    pub dependencies: usize,
}

/// Write a node with its config and child rows.
///
/// `stored` says whether a node row for `id` already exists under `project`;
/// such a row keeps its key and only has its attributes rewritten. The caller
/// must have removed the node's previous config and child rows.
pub fn write_node(
    conn: &Connection,
    project: &ProjectName,
    id: &NodeId,
    node: &Node,
    stored: bool,
) -> MetaResult<NodeRows> {
    if stored {
        conn.execute(
            "UPDATE dw_meta.node SET name = ?, resource_type = ?
             WHERE id = ? AND (name IS DISTINCT FROM ? OR resource_type IS DISTINCT FROM ?)",
            duckdb::params![
                node.name,
                node.resource_type,
                id.as_str(),
                node.name,
                node.resource_type
            ],
        )
        .populate_context(&format!("update node ({id})"))?;
    } else {
        conn.execute(
            "INSERT INTO dw_meta.node (id, name, resource_type, project_name) VALUES (?, ?, ?, ?)",
            duckdb::params![id.as_str(), node.name, node.resource_type, project.as_str()],
        )
        .populate_context(&format!("insert node ({id})"))?;
    }

    insert_config(conn, id, node)?;

    Ok(NodeRows {
        columns: insert_columns(conn, id, node)?,
        references: insert_references(conn, id, node)?,
        sources: insert_sources(conn, id, node)?,
        dependencies: insert_dependencies(conn, id, node)?,
    })
}

fn insert_config(conn: &Connection, id: &NodeId, node: &Node) -> MetaResult<()> {
    let config = &node.configuration;
    conn.execute(
        "INSERT INTO dw_meta.config (node_id, enabled, materialized, incremental_strategy, on_schema_change, on_configuration_change, severity)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            id.as_str(),
            config.enabled,
            config.materialized.as_deref(),
            config.incremental_strategy.as_deref(),
            config.on_schema_change.as_deref(),
            config.on_configuration_change.as_deref(),
            config.severity.as_deref(),
        ],
    )
    .populate_context(&format!("insert config ({id})"))?;
    Ok(())
}

fn insert_columns(conn: &Connection, id: &NodeId, node: &Node) -> MetaResult<usize> {
    let mut names: Vec<&String> = node.columns.keys().collect();
    names.sort();
    for name in &names {
        let data_type = node.columns[name.as_str()].data_type.as_deref();
        conn.execute(
            "INSERT INTO dw_meta.node_columns (node_id, column_name, data_type) VALUES (?, ?, ?)",
            duckdb::params![id.as_str(), name.as_str(), data_type],
        )
        .populate_context(&format!("insert node_columns ({id})"))?;
    }
    Ok(names.len())
}

fn insert_references(conn: &Connection, id: &NodeId, node: &Node) -> MetaResult<usize> {
    let refs = node.unique_refs();
    for reference in &refs {
        conn.execute(
            "INSERT INTO dw_meta.node_references (node_id, reference) VALUES (?, ?)",
            duckdb::params![id.as_str(), reference],
        )
        .populate_context(&format!("insert node_references ({id})"))?;
    }
    Ok(refs.len())
}

fn insert_sources(conn: &Connection, id: &NodeId, node: &Node) -> MetaResult<usize> {
    let sources = node.unique_sources();
    for (schema, table) in &sources {
        conn.execute(
            "INSERT INTO dw_meta.node_sources (node_id, source_schema, source_table) VALUES (?, ?, ?)",
            duckdb::params![id.as_str(), schema, table],
        )
        .populate_context(&format!("insert node_sources ({id})"))?;
    }
    Ok(sources.len())
}

fn insert_dependencies(conn: &Connection, id: &NodeId, node: &Node) -> MetaResult<usize> {
    let dependencies = node.unique_dependencies();
    for dependency in &dependencies {
        conn.execute(
            "INSERT INTO dw_meta.dependencies (node_id, dependency) VALUES (?, ?)",
            duckdb::params![id.as_str(), dependency],
        )
        .populate_context(&format!("insert dependencies ({id})"))?;
    }
    Ok(dependencies.len())
}
