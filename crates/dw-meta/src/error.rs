//! Error types for the manifest store.

use thiserror::Error;

/// Manifest store errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the store (M001).
    #[error("[M001] Store connection failed: {0}")]
    ConnectionError(String),

    /// Schema migration failed (M002).
    #[error("[M002] Store migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the store (M003).
    #[error("[M003] Store query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Store transaction failed: {0}")]
    TransactionError(String),

    /// Manifest rows could not be written (M005).
    #[error("[M005] Store population failed: {0}")]
    PopulationError(String),

    /// DuckDB driver error with preserved source chain (M006).
    #[error("[M006] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}

/// Attach a short description of the failing statement to a DuckDB error.
pub(crate) trait MetaResultExt<T> {
    fn populate_context(self, what: &str) -> MetaResult<T>;
}

impl<T> MetaResultExt<T> for Result<T, duckdb::Error> {
    fn populate_context(self, what: &str) -> MetaResult<T> {
        self.map_err(|e| MetaError::PopulationError(format!("{what}: {e}")))
    }
}
