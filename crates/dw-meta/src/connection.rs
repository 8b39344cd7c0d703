//! Store connection wrapper.
//!
//! [`MetaDb`] owns a DuckDB [`Connection`] and provides helpers for opening,
//! migrating, and transacting against the manifest store.

use crate::error::{MetaError, MetaResult};
use crate::migration::run_migrations;
use crate::populate::lifecycle::{clear_project_children, drop_project, prune_detached_nodes};
use crate::populate::{self, UpsertStats};
use crate::query::{self, TableDump};
use duckdb::Connection;
use dw_core::Manifest;
use std::path::Path;
use std::time::Duration;

/// Number of sample rows per table shown by [`MetaDb::dump`] by default.
pub const DEFAULT_DUMP_ROWS: usize = 5;

/// How often [`MetaDb::open`] retries while another process holds the file.
const LOCK_RETRY_ATTEMPTS: u32 = 40;
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Wrapper around a DuckDB connection to the store file.
///
/// DuckDB lets one process at a time open a file read-write, so callers
/// should hold a `MetaDb` only for the operation at hand. See
/// [`crate::Store`].
pub struct MetaDb {
    conn: Connection,
}

impl MetaDb {
    /// Open (or create) the store at `path` and run pending migrations.
    ///
    /// While another process holds the file the open is retried for about
    /// two seconds before failing with [`MetaError::ConnectionError`].
    pub fn open(path: &Path) -> MetaResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetaError::ConnectionError(format!("{e}: {}", parent.display()))
            })?;
        }

        let mut attempt = 1;
        let conn = loop {
            match Connection::open(path) {
                Ok(conn) => break conn,
                Err(e) if is_lock_conflict(&e) && attempt < LOCK_RETRY_ATTEMPTS => {
                    if attempt == 1 {
                        log::debug!("Store {} is busy, waiting", path.display());
                    }
                    attempt += 1;
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(MetaError::ConnectionError(format!("{e}: {}", path.display())))
                }
            }
        };
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory store with all migrations applied.
    pub fn open_memory() -> MetaResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| MetaError::ConnectionError(e.to_string()))?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `body` inside a transaction. It commits when `body` returns `Ok`;
    /// an error, a failed commit, or a panic inside `body` rolls it back.
    pub fn transaction<F, T>(&self, body: F) -> MetaResult<T>
    where
        F: FnOnce(&Connection) -> MetaResult<T>,
    {
        let tx = OpenTransaction::begin(&self.conn)?;
        let value = body(&self.conn)?;
        tx.commit()?;
        Ok(value)
    }

    /// Replace the stored snapshot of the manifest's project.
    ///
    /// The content is replaced in one transaction. Node rows the manifest no
    /// longer contains are deleted by a second one, since DuckDB cannot
    /// delete them in the transaction that removed their child rows.
    pub fn upsert_manifest(&self, manifest: &Manifest) -> MetaResult<UpsertStats> {
        let project = manifest.project_name();
        let stats = self.transaction(|conn| populate::upsert_manifest(conn, manifest))?;
        let pruned = self.transaction(|conn| prune_detached_nodes(conn, project.as_str()))?;
        if pruned > 0 {
            log::debug!("Removed {pruned} nodes no longer in project '{project}'");
        }
        log::info!("Stored {} nodes for project '{project}'", stats.nodes);
        Ok(stats)
    }

    /// Delete every stored row of `project_name`. Returns whether the project
    /// was stored.
    ///
    /// Runs as three transactions, one per level of the foreign-key chain.
    /// Calling it again after a failure finishes the job.
    pub fn delete_project(&self, project_name: &str) -> MetaResult<bool> {
        self.transaction(|conn| clear_project_children(conn, project_name))?;
        self.transaction(|conn| prune_detached_nodes(conn, project_name))?;
        self.transaction(|conn| drop_project(conn, project_name))
    }

    /// All store tables with up to `sample_rows` rows each.
    pub fn dump(&self, sample_rows: usize) -> MetaResult<Vec<TableDump>> {
        query::dump(&self.conn, sample_rows)
    }
}

/// A `BEGIN` that is rolled back on drop unless committed.
struct OpenTransaction<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl<'a> OpenTransaction<'a> {
    fn begin(conn: &'a Connection) -> MetaResult<Self> {
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MetaError::TransactionError(format!("BEGIN failed: {e}")))?;
        Ok(Self {
            conn,
            committed: false,
        })
    }

    fn commit(mut self) -> MetaResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| MetaError::TransactionError(format!("COMMIT failed: {e}")))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for OpenTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            log::warn!("ROLLBACK failed: {e}");
        }
    }
}

fn is_lock_conflict(err: &duckdb::Error) -> bool {
    err.to_string().contains("Could not set lock")
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
