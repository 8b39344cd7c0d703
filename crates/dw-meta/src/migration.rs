//! Schema migration runner for the manifest store.
//!
//! `dw_meta.schema_version` holds one row per applied migration. Each pending
//! migration runs in its own transaction together with the insert of its
//! version row, so a failed migration leaves the schema at the previous
//! version.

use crate::ddl::{Migration, MIGRATIONS};
use crate::error::{MetaError, MetaResult};
use duckdb::Connection;

const VERSION_TABLE: &str = "CREATE SCHEMA IF NOT EXISTS dw_meta;
CREATE TABLE IF NOT EXISTS dw_meta.schema_version (
    version    INTEGER NOT NULL,
    applied_at TIMESTAMP NOT NULL DEFAULT now()
);";

/// Highest applied migration version, or 0 on a fresh store.
pub fn schema_version(conn: &Connection) -> MetaResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM dw_meta.schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| MetaError::MigrationError(format!("read schema_version: {e}")))
}

/// Bring the schema behind `conn` up to the newest known migration.
pub fn run_migrations(conn: &Connection) -> MetaResult<()> {
    conn.execute_batch(VERSION_TABLE)
        .map_err(|e| MetaError::MigrationError(format!("create schema_version: {e}")))?;

    let from = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    for migration in &pending {
        apply(conn, migration)?;
    }
    if let Some(last) = pending.last() {
        log::debug!("Store schema migrated from v{from:03} to v{:03}", last.version);
    }
    Ok(())
}

fn apply(conn: &Connection, migration: &Migration) -> MetaResult<()> {
    let batch = format!(
        "BEGIN TRANSACTION;\n{}\nINSERT INTO dw_meta.schema_version (version) VALUES ({});\nCOMMIT;",
        migration.sql, migration.version
    );
    conn.execute_batch(&batch).map_err(|e| {
        if let Err(rollback) = conn.execute_batch("ROLLBACK") {
            log::debug!("ROLLBACK after failed migration: {rollback}");
        }
        MetaError::MigrationError(format!("v{:03}: {e}", migration.version))
    })
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
