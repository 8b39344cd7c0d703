//! Ingestion orchestrator: read → parse → persist with retry and backoff.
//!
//! Build tools write `manifest.json` incrementally, so the first change event
//! often sees a truncated file. Each attempt waits before reading, and the
//! wait doubles after every failure, until the file parses or the attempt
//! budget runs out.

use crate::error::{AttemptError, IngestError};
use crate::reader::ManifestReader;
use dw_core::{CoreError, IngestSettings, Manifest};
use dw_meta::{MetaError, Store, UpsertStats};
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Store handle shared by all ingestion tasks. One operation at a time.
pub type SharedStore = Arc<Store>;

/// Attempt budget and backoff for one ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before the first attempt; doubled after each failure
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single immediate attempt, for user-initiated refreshes.
    pub fn manual() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
        }
    }
}

impl From<&IngestSettings> for RetryPolicy {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: settings.initial_delay(),
        }
    }
}

/// Where a project's current (or last) ingestion stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Idle,
    Reading,
    Parsing,
    Persisting,
    Succeeded,
    Failed,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestPhase::Idle => "idle",
            IngestPhase::Reading => "reading",
            IngestPhase::Parsing => "parsing",
            IngestPhase::Persisting => "persisting",
            IngestPhase::Succeeded => "succeeded",
            IngestPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Registry name the ingestion ran for
    pub project: String,
    /// `metadata.project_name` of the stored manifest
    pub dbt_project_name: String,
    /// 1-based number of the attempt that succeeded
    pub attempts: u32,
    pub stats: UpsertStats,
}

/// Runs ingestion attempts against a shared store.
///
/// Attempts for the same project are serialized by a per-project lock held
/// for the whole retry sequence; different projects proceed concurrently.
pub struct Ingestor {
    store: SharedStore,
    reader: Arc<dyn ManifestReader>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    phases: Mutex<HashMap<String, IngestPhase>>,
    shutdown: watch::Receiver<bool>,
}

impl Ingestor {
    /// `shutdown` flipping to `true` cancels pending retries.
    pub fn new(
        store: SharedStore,
        reader: Arc<dyn ManifestReader>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            reader,
            locks: Mutex::new(HashMap::new()),
            phases: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// The shared store handle.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Current phase of `project`; `Idle` if it was never ingested.
    pub fn phase(&self, project: &str) -> IngestPhase {
        self.phases
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(project)
            .copied()
            .unwrap_or(IngestPhase::Idle)
    }

    fn set_phase(&self, project: &str, phase: IngestPhase) {
        log::debug!("[{project}] {phase}");
        self.phases
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(project.to_string(), phase);
    }

    fn project_lock(&self, project: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(project.to_string()).or_default())
    }

    /// Ingest the manifest at `path` for `project` under `policy`.
    ///
    /// Each attempt first waits, then reads, parses, and persists. The first
    /// success returns immediately. Retryable failures are logged and retried
    /// with a doubled wait; the last failure is returned once the budget is
    /// spent. A shutdown signal during a wait ends the sequence with
    /// [`IngestError::Cancelled`]; a running store transaction is never
    /// interrupted.
    pub async fn ingest(
        &self,
        path: &Path,
        project: &str,
        policy: RetryPolicy,
    ) -> Result<IngestReport, IngestError> {
        let lock = self.project_lock(project);
        let _guard = lock.lock().await;

        let max_attempts = policy.max_attempts.max(1);
        let mut delay = policy.initial_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            if self.wait(delay).await.is_break() {
                self.set_phase(project, IngestPhase::Failed);
                return Err(IngestError::Cancelled {
                    project: project.to_string(),
                });
            }

            let error = match self.attempt(path, project).await {
                Ok((dbt_project_name, stats)) => {
                    self.set_phase(project, IngestPhase::Succeeded);
                    return Ok(IngestReport {
                        project: project.to_string(),
                        dbt_project_name,
                        attempts: attempt,
                        stats,
                    });
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                self.set_phase(project, IngestPhase::Failed);
                return Err(IngestError::Aborted {
                    project: project.to_string(),
                    attempt,
                    error,
                });
            }
            log::warn!(
                "Error processing manifest for project '{project}' ({}, attempt {attempt}/{max_attempts}): {error}",
                error.kind()
            );
            if attempt >= max_attempts {
                self.set_phase(project, IngestPhase::Failed);
                return Err(IngestError::Exhausted {
                    project: project.to_string(),
                    attempts: attempt,
                    last: error,
                });
            }
            delay = delay.saturating_mul(2);
        }
    }

    /// Sleep for `delay`. Breaks early if shutdown is requested.
    async fn wait(&self, delay: Duration) -> ControlFlow<()> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow_and_update() {
            return ControlFlow::Break(());
        }
        if delay.is_zero() {
            return ControlFlow::Continue(());
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => ControlFlow::Continue(()),
            _ = shutdown_requested(shutdown) => ControlFlow::Break(()),
        }
    }

    async fn attempt(
        &self,
        path: &Path,
        project: &str,
    ) -> Result<(String, UpsertStats), AttemptError> {
        self.set_phase(project, IngestPhase::Reading);
        let text = self.reader.read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AttemptError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                AttemptError::Read {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        self.set_phase(project, IngestPhase::Parsing);
        let manifest = Manifest::from_json(&text).map_err(|e| match e {
            CoreError::MalformedManifest { message, .. } => {
                AttemptError::Malformed(CoreError::MalformedManifest {
                    path: Some(path.display().to_string()),
                    message,
                })
            }
            other => AttemptError::Malformed(other),
        })?;

        self.set_phase(project, IngestPhase::Persisting);
        let store = Arc::clone(&self.store);
        let persisted = tokio::task::spawn_blocking(move || {
            store
                .with(|db| db.upsert_manifest(&manifest))
                .map(|stats| (manifest.project_name().to_string(), stats))
        })
        .await
        .map_err(|e| MetaError::TransactionError(format!("persist task failed: {e}")))?;

        Ok(persisted?)
    }
}

/// Resolves once the shutdown flag is set. Never resolves if the sender is
/// gone, since nobody can request shutdown any more.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
