//! Typed model of a dbt `manifest.json` and its strict parser.
//!
//! Only the parts of the manifest the store persists are modelled. Unknown
//! fields are ignored, so manifests from newer dbt releases still load as long
//! as the modelled fields keep their shape.

use crate::error::{CoreError, CoreResult};
use crate::names::{NodeId, ProjectName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Root of a parsed manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// All nodes keyed by their unique id
    pub nodes: HashMap<NodeId, Node>,

    /// Project-level metadata
    pub metadata: Metadata,
}

/// Manifest metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// dbt project name; the store's project identity
    pub project_name: ProjectName,
}

/// One build unit (model, seed, test, snapshot, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node name
    pub name: String,

    /// Resource type; kept open because dbt keeps adding new ones
    pub resource_type: String,

    /// Node configuration
    #[serde(rename = "config", default)]
    pub configuration: NodeConfig,

    /// Documented columns keyed by column name
    #[serde(default)]
    pub columns: HashMap<String, Column>,

    /// `ref()` calls in source order
    #[serde(default)]
    pub refs: Vec<Ref>,

    /// `source()` calls as `[schema, table]` pairs
    #[serde(default)]
    pub sources: Vec<(String, String)>,

    /// Upstream node ids
    #[serde(rename = "depends_on", default)]
    pub dependencies: DependsOn,
}

/// Node configuration block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub enabled: bool,
    #[serde(default)]
    pub materialized: Option<String>,
    #[serde(default)]
    pub incremental_strategy: Option<String>,
    #[serde(default)]
    pub on_schema_change: Option<String>,
    #[serde(default)]
    pub on_configuration_change: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// A documented column. The persisted name is the key in [`Node::columns`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
}

/// A `ref()` to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub name: String,
}

/// Upstream dependencies of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Node counts of a manifest, grouped by resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSummary {
    pub project_name: String,
    pub node_count: usize,
    pub by_resource_type: BTreeMap<String, usize>,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    ///
    /// Either the whole document validates or a
    /// [`CoreError::MalformedManifest`] is returned with serde's diagnostic.
    pub fn from_json(text: &str) -> CoreResult<Self> {
        serde_json::from_str(text).map_err(|e| CoreError::MalformedManifest {
            path: None,
            message: e.to_string(),
        })
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::ManifestNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CoreError::IoWithPath {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;
        Self::from_json(&content).map_err(|e| match e {
            CoreError::MalformedManifest { message, .. } => CoreError::MalformedManifest {
                path: Some(path.display().to_string()),
                message,
            },
            other => other,
        })
    }

    /// The project identity used by the store.
    pub fn project_name(&self) -> &ProjectName {
        &self.metadata.project_name
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes ordered by id, for deterministic iteration.
    pub fn nodes_sorted(&self) -> Vec<(&NodeId, &Node)> {
        let mut nodes: Vec<_> = self.nodes.iter().collect();
        nodes.sort_by(|a, b| a.0.cmp(b.0));
        nodes
    }

    /// Count nodes per resource type.
    pub fn summary(&self) -> ManifestSummary {
        let mut by_resource_type = BTreeMap::new();
        for node in self.nodes.values() {
            *by_resource_type
                .entry(node.resource_type.clone())
                .or_insert(0) += 1;
        }
        ManifestSummary {
            project_name: self.metadata.project_name.to_string(),
            node_count: self.nodes.len(),
            by_resource_type,
        }
    }
}

impl Node {
    /// `(schema, table)` source pairs with duplicates removed.
    pub fn unique_sources(&self) -> BTreeSet<(&str, &str)> {
        self.sources
            .iter()
            .map(|(schema, table)| (schema.as_str(), table.as_str()))
            .collect()
    }

    /// Referenced node names with duplicates removed.
    ///
    /// A model that calls `ref('x')` twice lists `x` twice.
    pub fn unique_refs(&self) -> BTreeSet<&str> {
        self.refs.iter().map(|r| r.name.as_str()).collect()
    }

    /// Upstream node ids with duplicates removed.
    pub fn unique_dependencies(&self) -> BTreeSet<&str> {
        self.dependencies.nodes.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod tests;
