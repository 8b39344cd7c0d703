//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dw_core::registry::{default_config_path, default_database_path};
use dw_meta::{MetaDb, Store};
use dw_watch::WatchContext;
use std::path::PathBuf;

use crate::cli::GlobalArgs;

/// Registry path from `--config` / `DW_CONFIG`, else the user config dir.
pub(crate) fn registry_path(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.config {
        Some(path) => Ok(path.clone()),
        None => Ok(default_config_path()?),
    }
}

/// Store path from `--database` / `DW_DATABASE`, else the user data dir.
pub(crate) fn database_path(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.database {
        Some(path) => Ok(path.clone()),
        None => Ok(default_database_path()?),
    }
}

/// Open the store for the rest of the command, creating it on first use.
/// Waits briefly if another process (a running `dw watch`) is writing.
pub(crate) fn open_store(global: &GlobalArgs) -> Result<MetaDb> {
    let path = database_path(global)?;
    log::debug!("Opening store at {}", path.display());
    MetaDb::open(&path).with_context(|| format!("Failed to open store at {}", path.display()))
}

/// Open the registry together with a store handle that only holds the
/// database file while an operation runs.
pub(crate) fn open_context(global: &GlobalArgs) -> Result<WatchContext> {
    let registry = registry_path(global)?;
    let path = database_path(global)?;
    log::debug!("Using store at {}", path.display());
    let store =
        Store::file(&path).with_context(|| format!("Failed to open store at {}", path.display()))?;
    WatchContext::open(&registry, store)
        .with_context(|| format!("Failed to load project registry {}", registry.display()))
}

/// Rows as JSON objects keyed by column name. The store renders SQL NULL
/// as `"null"`, which maps back to JSON null.
pub(crate) fn rows_to_json(columns: &[String], rows: &[Vec<String>]) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|row| {
            let map: serde_json::Map<String, serde_json::Value> = columns
                .iter()
                .zip(row.iter())
                .map(|(col, val)| {
                    let json_val = if val == "null" {
                        serde_json::Value::Null
                    } else {
                        serde_json::Value::String(val.clone())
                    };
                    (col.clone(), json_val)
                })
                .collect();
            serde_json::Value::Object(map)
        })
        .collect()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
