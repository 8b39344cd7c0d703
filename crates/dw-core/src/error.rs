//! Error types for dw-core

use thiserror::Error;

/// Core error type for dbtwatch
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Manifest file does not exist
    #[error("[E001] Manifest not found: {path}")]
    ManifestNotFound { path: String },

    /// E002: Manifest is not valid JSON or violates the manifest schema
    #[error("[E002] Malformed manifest{}: {message}", source_suffix(.path))]
    MalformedManifest {
        path: Option<String>,
        message: String,
    },

    /// E003: Failed to parse the registry file
    #[error("[E003] Failed to parse config '{path}': {message}")]
    ConfigParseError { path: String, message: String },

    /// E004: Invalid registry value
    #[error("[E004] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E005: Project is not registered
    #[error("[E005] Project not registered: {name}")]
    ProjectNotFound { name: String },

    /// E006: Project name already registered
    #[error("[E006] Project '{name}' is already registered")]
    DuplicateProject { name: String },

    /// E007: Project roots may not contain one another
    #[error("[E007] Project root '{path}' overlaps with registered project '{existing}' at '{existing_path}'")]
    OverlappingProjects {
        path: String,
        existing: String,
        existing_path: String,
    },

    /// E008: IO error with file path context
    #[error("[E008] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E009: JSON serialization error
    #[error("[E009] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn source_suffix(path: &Option<String>) -> String {
    match path {
        Some(p) => format!(" '{p}'"),
        None => String::new(),
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
