//! Error types for dw-watch

use dw_core::CoreError;
use dw_meta::MetaError;
use thiserror::Error;

/// Filesystem watch errors. Scoped to one project; other watches keep running.
#[derive(Error, Debug)]
pub enum WatchError {
    /// W001: The watcher could not be created or attached
    #[error("[W001] Failed to watch '{path}': {source}")]
    Establish {
        path: String,
        #[source]
        source: notify::Error,
    },

    /// W002: The directory to watch does not exist yet
    #[error("[W002] Watch directory '{path}' does not exist; run `dbt parse` in the project first")]
    MissingDirectory { path: String },
}

/// Why a single ingestion attempt failed.
#[derive(Error, Debug)]
pub enum AttemptError {
    /// The manifest file is absent (possibly not written yet)
    #[error("manifest not found at {path}")]
    NotFound { path: String },

    /// The manifest file exists but could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or violates the schema
    #[error(transparent)]
    Malformed(CoreError),

    /// The store transaction failed and was rolled back
    #[error(transparent)]
    Store(#[from] MetaError),
}

impl AttemptError {
    /// Whether another attempt can be expected to behave differently.
    ///
    /// A half-written file parses as malformed and a missing file may be
    /// mid-rename, so both are retried. Permission errors are not transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Read { source, .. } => {
                source.kind() != std::io::ErrorKind::PermissionDenied
            }
            AttemptError::NotFound { .. }
            | AttemptError::Malformed(_)
            | AttemptError::Store(_) => true,
        }
    }

    /// Short label used in attempt log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::NotFound { .. } => "not found",
            AttemptError::Read { .. } => "read error",
            AttemptError::Malformed(_) => "malformed manifest",
            AttemptError::Store(_) => "store error",
        }
    }
}

/// Terminal outcome of an ingestion request.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I001: Manifest absent when a manual refresh was requested
    #[error("[I001] Manifest for project '{project}' not found at {path}")]
    NotFound { project: String, path: String },

    /// I002: Every attempt failed
    #[error("[I002] Failed to ingest manifest for project '{project}' after {attempts} attempts: {last}")]
    Exhausted {
        project: String,
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    /// I003: An attempt failed in a way retrying cannot fix
    #[error("[I003] Ingestion for project '{project}' aborted on attempt {attempt}: {error}")]
    Aborted {
        project: String,
        attempt: u32,
        #[source]
        error: AttemptError,
    },

    /// I004: Shutdown was requested before the next attempt
    #[error("[I004] Ingestion for project '{project}' cancelled by shutdown")]
    Cancelled { project: String },

    /// I005: Project is not registered
    #[error("[I005] Project not registered: {project}")]
    UnknownProject { project: String },
}

/// Errors from registry-changing operations on the watch context.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Registry(#[from] CoreError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Store(#[from] MetaError),

    /// C001: Purging would delete rows another registration still uses
    #[error("[C001] Not purging '{project}': stored project '{dbt_project_name}' also belongs to registered project '{other}'")]
    SharedRows {
        project: String,
        dbt_project_name: String,
        other: String,
    },
}
