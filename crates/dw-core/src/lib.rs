//! dw-core - Core library for dbtwatch
//!
//! This crate provides the typed dbt manifest model and its strict parser,
//! the project registry persisted between sessions, and the shared error
//! types used by the store and the watcher.

pub mod error;
pub mod manifest;
pub mod names;
mod newtype_string;
pub mod registry;

pub use error::{CoreError, CoreResult};
pub use manifest::{Column, DependsOn, Manifest, ManifestSummary, Metadata, Node, NodeConfig, Ref};
pub use names::{NodeId, ProjectName};
pub use registry::{IngestSettings, ProjectEntry, Registry};
