//! Orchestrator context.
//!
//! `WatchContext` owns everything the running service needs: the registry
//! and where it is saved, the shared store, the change detector and the
//! ingestor. Registry mutations and detector registration happen together
//! under `&mut self`, so the two never disagree about which projects exist.
//!
//! Other processes may edit the registry file while the watch loop runs
//! (`dw add` from another shell). The loop polls the file's modification
//! time and re-syncs the detector when it changes.

use crate::detector::{ChangeDetector, ManifestChanged};
use crate::error::{ContextError, IngestError, WatchError};
use crate::ingest::{IngestReport, Ingestor, RetryPolicy, SharedStore};
use crate::reader::{FsManifestReader, ManifestReader};
use dw_core::{CoreError, Manifest, ProjectEntry, Registry};
use dw_meta::{MetaResult, ProjectSummary, Store, TableDump};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};

/// How often the watch loop checks the registry file for outside edits.
pub const REGISTRY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of removing a project from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedProject {
    pub name: String,
    pub entry: ProjectEntry,
    /// Whether stored rows were deleted along with the registration
    pub purged: bool,
}

pub struct WatchContext {
    registry: Registry,
    registry_path: PathBuf,
    /// Modification time of the registry file as last read or written
    registry_stamp: Option<SystemTime>,
    detector: ChangeDetector,
    ingestor: Arc<Ingestor>,
    events: Option<mpsc::UnboundedReceiver<ManifestChanged>>,
    shutdown: watch::Sender<bool>,
}

impl WatchContext {
    /// Load the registry at `registry_path` (empty if absent) and bind it to
    /// `store`. Manifests are read from the local filesystem.
    pub fn open(registry_path: &Path, store: Store) -> Result<Self, ContextError> {
        Self::with_reader(registry_path, store, Arc::new(FsManifestReader))
    }

    pub fn with_reader(
        registry_path: &Path,
        store: Store,
        reader: Arc<dyn ManifestReader>,
    ) -> Result<Self, ContextError> {
        let registry_stamp = modified_time(registry_path);
        let registry = Registry::load_or_default(registry_path)?;
        let (sender, events) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut detector = ChangeDetector::new(sender);
        for (name, entry) in &registry.projects {
            detector.watch(name, &entry.path)?;
        }

        let store: SharedStore = Arc::new(store);
        Ok(Self {
            registry,
            registry_path: registry_path.to_path_buf(),
            registry_stamp,
            detector,
            ingestor: Arc::new(Ingestor::new(store, reader, shutdown_rx)),
            events: Some(events),
            shutdown,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registered projects by name.
    pub fn projects(&self) -> &BTreeMap<String, ProjectEntry> {
        &self.registry.projects
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn store(&self) -> &Store {
        self.ingestor.store()
    }

    /// Register `name` at `path` and start tracking it.
    ///
    /// The path is canonicalized so watcher-reported paths resolve to it. If
    /// a manifest already exists its project name is cached in the entry.
    /// The registry file is written last; if that fails the watch is
    /// removed again and the in-memory registry is unchanged.
    pub fn add_project(&mut self, name: &str, path: &Path) -> Result<ProjectEntry, ContextError> {
        let root = std::fs::canonicalize(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut entry = ProjectEntry {
            path: root,
            dbt_project_name: None,
        };
        let manifest_path = entry.manifest_path();
        if manifest_path.exists() {
            match Manifest::load(&manifest_path) {
                Ok(manifest) => entry.dbt_project_name = Some(manifest.project_name().to_string()),
                Err(e) => log::warn!("Ignoring existing manifest for '{name}': {e}"),
            }
        }

        if let Some(dbt_name) = &entry.dbt_project_name {
            if let Err(e) = self.ensure_unshared(name, dbt_name) {
                log::warn!("{e}; both registrations write the same stored rows");
            }
        }

        let mut registry = self.registry.clone();
        registry.add(name, entry.clone())?;
        self.detector.watch(name, &entry.path)?;
        if let Err(e) = self.save_registry(registry) {
            self.detector.unwatch(name);
            return Err(e.into());
        }

        log::info!("Added project '{name}' at {}", entry.path.display());
        Ok(entry)
    }

    /// Unregister `name` and stop watching it.
    ///
    /// Stored rows are kept unless `purge` is set. Purging needs the
    /// manifest's project name: the cached one, or else whatever the current
    /// manifest file says. Without either nothing is deleted. Rows are keyed
    /// by that name, so if another registered project caches the same name
    /// the removal is refused with [`ContextError::SharedRows`].
    ///
    /// The registry is saved before any rows are deleted; a failed purge
    /// leaves the project unregistered with its rows still stored.
    pub fn remove_project(&mut self, name: &str, purge: bool) -> Result<RemovedProject, ContextError> {
        let entry = self.registry.get(name)?.clone();

        let dbt_name = if purge {
            let dbt_name = entry.dbt_project_name.clone().or_else(|| {
                Manifest::load(&entry.manifest_path())
                    .ok()
                    .map(|m| m.project_name().to_string())
            });
            if let Some(dbt_name) = &dbt_name {
                self.ensure_unshared(name, dbt_name)?;
            }
            dbt_name
        } else {
            None
        };

        let mut registry = self.registry.clone();
        registry.remove(name)?;
        self.save_registry(registry)?;
        self.detector.unwatch(name);
        log::info!("Removed project '{name}'");

        let purged = match dbt_name {
            Some(dbt_name) => self.store().with(|db| db.delete_project(&dbt_name))?,
            None => {
                if purge {
                    log::warn!("No manifest project name known for '{name}', nothing to purge");
                }
                false
            }
        };

        Ok(RemovedProject {
            name: name.to_string(),
            entry,
            purged,
        })
    }

    /// Fail if a registration other than `name` caches `dbt_name`.
    fn ensure_unshared(&self, name: &str, dbt_name: &str) -> Result<(), ContextError> {
        let other = self
            .registry
            .projects
            .iter()
            .find(|(other, entry)| {
                other.as_str() != name && entry.dbt_project_name.as_deref() == Some(dbt_name)
            });
        match other {
            Some((other, _)) => Err(ContextError::SharedRows {
                project: name.to_string(),
                dbt_project_name: dbt_name.to_string(),
                other: other.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Parse the current manifest of `name` without storing it.
    pub fn preview(&self, name: &str) -> Result<Manifest, ContextError> {
        let entry = self.registry.get(name)?;
        Ok(Manifest::load(&entry.manifest_path())?)
    }

    /// Ingest `name`'s manifest now: one attempt, no delay.
    pub async fn refresh(&mut self, name: &str) -> Result<IngestReport, IngestError> {
        let entry = self
            .registry
            .get(name)
            .map_err(|_| IngestError::UnknownProject {
                project: name.to_string(),
            })?;
        let path = entry.manifest_path();
        if !path.exists() {
            return Err(IngestError::NotFound {
                project: name.to_string(),
                path: path.display().to_string(),
            });
        }

        let report = self
            .ingestor
            .ingest(&path, name, RetryPolicy::manual())
            .await?;
        self.note_dbt_project_name(name, &report.dbt_project_name);
        Ok(report)
    }

    /// Projects present in the store with node counts and last ingest time.
    pub fn stored_projects(&self) -> MetaResult<Vec<ProjectSummary>> {
        self.store()
            .with(|db| dw_meta::query::list_projects(db.conn()))
    }

    /// Every store table with up to `limit` sample rows.
    pub fn dump(&self, limit: usize) -> MetaResult<Vec<TableDump>> {
        self.store().with(|db| db.dump(limit))
    }

    /// Re-read the registry file if another process changed it since it was
    /// last read or written, and bring the detector in line with it.
    /// Returns whether anything was reloaded.
    pub fn sync_registry(&mut self) -> Result<bool, ContextError> {
        let stamp = modified_time(&self.registry_path);
        if stamp == self.registry_stamp {
            return Ok(false);
        }
        self.registry_stamp = stamp;
        let reloaded = Registry::load_or_default(&self.registry_path)?;

        let previous = std::mem::replace(&mut self.registry, reloaded);
        for (name, old) in &previous.projects {
            if self.registry.projects.get(name).map(|e| &e.path) != Some(&old.path) {
                self.detector.unwatch(name);
            }
        }
        let added: Vec<(String, PathBuf)> = self
            .registry
            .projects
            .iter()
            .filter(|(name, entry)| {
                previous.projects.get(*name).map(|e| &e.path) != Some(&entry.path)
            })
            .map(|(name, entry)| (name.clone(), entry.path.clone()))
            .collect();
        for (name, root) in added {
            match self.detector.watch(&name, &root) {
                Ok(()) => log::info!("Picked up project '{name}' from the registry"),
                Err(e) => log::warn!("Not watching project '{name}': {e}"),
            }
        }
        Ok(true)
    }

    /// Establish watches for all registered projects and allow ingestion.
    /// Projects whose watch fails are logged and returned; the rest run.
    pub fn start(&mut self) -> Vec<(String, WatchError)> {
        self.shutdown.send_replace(false);
        let failures = self.detector.start();
        for (project, e) in &failures {
            log::warn!("Not watching project '{project}': {e}");
        }
        failures
    }

    /// Drop all watches and cancel pending retries.
    pub fn stop(&mut self) {
        self.detector.stop();
        self.shutdown.send_replace(true);
    }

    /// Watch and ingest until `shutdown` resolves.
    ///
    /// Each change event becomes its own ingestion task using the registry's
    /// retry settings. On shutdown the watches are dropped, pending retries
    /// are cancelled and in-flight ingestions are awaited before returning.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Some(mut events) = self.events.take() else {
            log::warn!("Watch loop is already running");
            return;
        };

        self.start();
        log::info!(
            "Watching {} project(s), up to {} attempt(s) per change",
            self.detector.watched_projects().len(),
            self.registry.ingest.max_attempts
        );

        let mut tasks = JoinSet::new();
        let mut poll = tokio::time::interval(REGISTRY_POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                Some(change) = events.recv() => {
                    let ingestor = Arc::clone(&self.ingestor);
                    let policy = RetryPolicy::from(&self.registry.ingest);
                    tasks.spawn(async move {
                        ingestor.ingest(&change.path, &change.project, policy).await
                    });
                }
                Some(joined) = tasks.join_next() => self.finish(joined),
                _ = poll.tick() => {
                    if let Err(e) = self.sync_registry() {
                        log::warn!("Failed to reload registry: {e}");
                    }
                }
            }
        }

        self.stop();
        while let Some(joined) = tasks.join_next().await {
            self.finish(joined);
        }
        while events.try_recv().is_ok() {}
        self.events = Some(events);
    }

    fn finish(&mut self, joined: Result<Result<IngestReport, IngestError>, JoinError>) {
        match joined {
            Ok(Ok(report)) => {
                log::info!(
                    "Ingested project '{}' ({} nodes, attempt {})",
                    report.project,
                    report.stats.nodes,
                    report.attempts
                );
                self.note_dbt_project_name(&report.project, &report.dbt_project_name);
            }
            Ok(Err(e @ IngestError::Cancelled { .. })) => log::debug!("{e}"),
            Ok(Err(e)) => log::error!("{e}"),
            Err(e) => log::error!("Ingestion task failed: {e}"),
        }
    }

    /// Cache the manifest's project name in the registry entry. The file is
    /// re-read first so edits made by other processes are not overwritten.
    fn note_dbt_project_name(&mut self, name: &str, dbt_project_name: &str) {
        if let Err(e) = self.sync_registry() {
            log::warn!("Failed to reload registry: {e}");
        }
        let mut registry = self.registry.clone();
        if registry.set_dbt_project_name(name, dbt_project_name) {
            if let Err(e) = self.save_registry(registry) {
                log::warn!("Failed to save registry: {e}");
            }
        }
    }

    /// Write `registry` to disk and adopt it.
    fn save_registry(&mut self, registry: Registry) -> Result<(), CoreError> {
        registry.save(&self.registry_path)?;
        self.registry_stamp = modified_time(&self.registry_path);
        self.registry = registry;
        Ok(())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
