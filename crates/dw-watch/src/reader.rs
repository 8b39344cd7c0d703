//! Manifest reading seam.

use async_trait::async_trait;
use std::path::Path;

/// Source of manifest text for an ingestion attempt.
#[async_trait]
pub trait ManifestReader: Send + Sync {
    /// Read the whole manifest as UTF-8 text.
    async fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads manifests from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsManifestReader;

#[async_trait]
impl ManifestReader for FsManifestReader {
    async fn read(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
