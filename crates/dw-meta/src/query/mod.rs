//! Read helpers for the manifest store.
//!
//! - [`adhoc`] - Ad-hoc SQL queries, table listing, row counts
//! - [`dump`] - Per-table sample dump for human inspection
//! - [`projects`] - Stored projects with node counts
//! - [`render`] - Text rendering of result values

pub mod adhoc;
pub mod dump;
pub mod projects;
pub mod render;

pub use adhoc::{execute_query, list_tables, table_row_count, QueryResult};
pub use dump::{dump, TableDump};
pub use projects::{list_projects, ProjectSummary};
