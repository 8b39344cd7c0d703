//! dw-watch - Change detection and ingestion for dbtwatch
//!
//! Watches each registered project's `target/` directory, resolves manifest
//! writes to the owning project, and drives read → parse → persist with
//! bounded retry and exponential backoff.

pub mod context;
pub mod detector;
pub mod error;
pub mod ingest;
pub mod reader;

pub use context::{RemovedProject, WatchContext};
pub use detector::{ChangeDetector, ManifestChanged};
pub use error::{AttemptError, ContextError, IngestError, WatchError};
pub use ingest::{IngestPhase, IngestReport, Ingestor, RetryPolicy, SharedStore};
pub use reader::{FsManifestReader, ManifestReader};
