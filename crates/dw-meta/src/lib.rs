//! Manifest store for dbtwatch.
//!
//! Provides a DuckDB-backed store that holds the latest ingested manifest of
//! every tracked dbt project in normalized tables under the `dw_meta` schema.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod migration;
pub mod populate;
pub mod query;
pub mod store;

pub use connection::MetaDb;
pub use error::{MetaError, MetaResult};
pub use populate::UpsertStats;
pub use query::{ProjectSummary, QueryResult, TableDump};
pub use store::Store;
