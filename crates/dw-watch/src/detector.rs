//! Manifest change detection.
//!
//! One non-recursive watch per project on `<root>/target`. Every create or
//! content-modify event on a file named `manifest.json` is resolved to the
//! project whose root contains it and forwarded as a [`ManifestChanged`].

use crate::error::WatchError;
use dw_core::registry::{MANIFEST_FILE, TARGET_DIR};
use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// A manifest file changed inside a registered project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestChanged {
    /// Registry name of the owning project
    pub project: String,
    /// Path of the manifest file as reported by the watcher
    pub path: PathBuf,
}

type Roots = Arc<RwLock<BTreeMap<String, PathBuf>>>;

/// Maintains filesystem watches for registered projects.
pub struct ChangeDetector {
    roots: Roots,
    handles: HashMap<String, RecommendedWatcher>,
    sender: mpsc::UnboundedSender<ManifestChanged>,
    running: bool,
}

impl ChangeDetector {
    /// Events are delivered on `sender` once [`start`](Self::start) is called.
    pub fn new(sender: mpsc::UnboundedSender<ManifestChanged>) -> Self {
        Self {
            roots: Arc::new(RwLock::new(BTreeMap::new())),
            handles: HashMap::new(),
            sender,
            running: false,
        }
    }

    /// Track `project` rooted at `root`. If the detector is running the watch
    /// is established immediately; on failure the project is not tracked.
    pub fn watch(&mut self, project: &str, root: &Path) -> Result<(), WatchError> {
        self.roots
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(project.to_string(), root.to_path_buf());

        if self.running {
            if let Err(e) = self.establish(project, root) {
                self.roots
                    .write()
                    .unwrap_or_else(|p| p.into_inner())
                    .remove(project);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Stop tracking `project`. Unknown names are ignored.
    pub fn unwatch(&mut self, project: &str) {
        self.roots
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(project);
        if self.handles.remove(project).is_some() {
            log::info!("Stopped watching project '{project}'");
        }
    }

    /// Establish watches for every tracked project.
    ///
    /// A project whose watch fails stays tracked but unwatched; the failures
    /// are returned so the caller can report them while the rest keep
    /// running.
    pub fn start(&mut self) -> Vec<(String, WatchError)> {
        self.running = true;
        let roots: Vec<(String, PathBuf)> = self
            .roots
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(name, root)| (name.clone(), root.clone()))
            .collect();

        let mut failures = Vec::new();
        for (project, root) in roots {
            if self.handles.contains_key(&project) {
                continue;
            }
            if let Err(e) = self.establish(&project, &root) {
                failures.push((project, e));
            }
        }
        failures
    }

    /// Drop every watch. Tracked projects are kept for a later `start`.
    pub fn stop(&mut self) {
        self.running = false;
        self.handles.clear();
    }

    /// Whether a live watch exists for `project`.
    pub fn is_watching(&self, project: &str) -> bool {
        self.handles.contains_key(project)
    }

    /// Names of projects with a live watch, sorted.
    pub fn watched_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.keys().cloned().collect();
        names.sort();
        names
    }

    fn establish(&mut self, project: &str, root: &Path) -> Result<(), WatchError> {
        let dir = root.join(TARGET_DIR);
        if !dir.is_dir() {
            return Err(WatchError::MissingDirectory {
                path: dir.display().to_string(),
            });
        }

        let roots = Arc::clone(&self.roots);
        let sender = self.sender.clone();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => forward(&roots, &sender, &event),
            Err(e) => log::warn!("Watch error: {e}"),
        };

        let establish_err = |source| WatchError::Establish {
            path: dir.display().to_string(),
            source,
        };
        let mut watcher = RecommendedWatcher::new(handler, Config::default()).map_err(establish_err)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(establish_err)?;

        log::info!("Watching {} for project '{project}'", dir.display());
        self.handles.insert(project.to_string(), watcher);
        Ok(())
    }
}

fn forward(roots: &Roots, sender: &mpsc::UnboundedSender<ManifestChanged>, event: &Event) {
    for path in manifest_paths(event) {
        let owner = {
            let roots = roots.read().unwrap_or_else(|p| p.into_inner());
            resolve_owner(&roots, path)
        };
        match owner {
            Some(project) => {
                log::debug!("Manifest change in project '{project}': {}", path.display());
                let change = ManifestChanged {
                    project,
                    path: path.to_path_buf(),
                };
                if sender.send(change).is_err() {
                    log::debug!("Change receiver closed, dropping event");
                }
            }
            None => log::warn!("No registered project owns {}", path.display()),
        }
    }
}

/// Paths in `event` that name a manifest file written with new content.
pub fn manifest_paths(event: &Event) -> impl Iterator<Item = &Path> {
    let relevant = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    event
        .paths
        .iter()
        .filter(move |_| relevant)
        .map(PathBuf::as_path)
        .filter(|path| path.file_name().is_some_and(|name| name == MANIFEST_FILE))
}

/// The project whose root contains `path`, if any.
pub fn resolve_owner(roots: &BTreeMap<String, PathBuf>, path: &Path) -> Option<String> {
    roots
        .iter()
        .find(|(_, root)| path.starts_with(root))
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
#[path = "detector_test.rs"]
mod tests;
