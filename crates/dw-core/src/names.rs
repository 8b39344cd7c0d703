//! Strongly-typed identifiers used by the manifest model.

use crate::newtype_string::define_identifier;

define_identifier! {
    /// Unique id of a manifest node, e.g. `model.shop.orders`.
    ///
    /// Stable across re-ingestion of the same project; the store keys every
    /// node row and child row on it.
    pub struct NodeId;
}

define_identifier! {
    /// The dbt project name from `metadata.project_name`.
    pub struct ProjectName;
}

#[cfg(test)]
#[path = "names_test.rs"]
mod tests;
