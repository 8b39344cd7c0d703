//! Store handle for long-running processes.
//!
//! DuckDB takes an exclusive lock on a database file for as long as a
//! read-write connection is open. A file-backed [`Store`] therefore opens a
//! fresh [`MetaDb`] for every [`Store::with`] call and closes it afterwards,
//! so other processes can use the file between operations.

use crate::connection::MetaDb;
use crate::error::MetaResult;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Serialized access to the manifest store.
pub enum Store {
    /// A database file, opened per operation.
    File { path: PathBuf, gate: Mutex<()> },
    /// A connection kept open for the life of the handle.
    Resident(Mutex<MetaDb>),
}

impl Store {
    /// Handle for the file at `path`. The file is created and migrated now,
    /// then closed again.
    pub fn file(path: &Path) -> MetaResult<Self> {
        drop(MetaDb::open(path)?);
        Ok(Store::File {
            path: path.to_path_buf(),
            gate: Mutex::new(()),
        })
    }

    /// Handle for a fresh in-memory store.
    pub fn memory() -> MetaResult<Self> {
        Ok(Self::resident(MetaDb::open_memory()?))
    }

    /// Handle that keeps `db` open.
    pub fn resident(db: MetaDb) -> Self {
        Store::Resident(Mutex::new(db))
    }

    /// The database file, if this handle is file-backed.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Store::File { path, .. } => Some(path),
            Store::Resident(_) => None,
        }
    }

    /// Run `body` against the store. Calls through the same handle never
    /// overlap. Mutex poisoning is tolerated: every write is a transaction,
    /// so a panicked holder cannot leave partial rows.
    pub fn with<T, F>(&self, body: F) -> MetaResult<T>
    where
        F: FnOnce(&MetaDb) -> MetaResult<T>,
    {
        match self {
            Store::File { path, gate } => {
                let _held = gate.lock().unwrap_or_else(|p| p.into_inner());
                let db = MetaDb::open(path)?;
                body(&db)
            }
            Store::Resident(db) => {
                let db = db.lock().unwrap_or_else(|p| p.into_inner());
                body(&db)
            }
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
