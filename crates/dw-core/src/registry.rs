//! Project registry: which dbt projects are tracked and where they live.
//!
//! Persisted as JSON in the user's config directory. The registry name is a
//! display name chosen by the user; the store is keyed by the manifest's own
//! `metadata.project_name`, which is cached here as `dbt_project_name`.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory inside a dbt project that holds build artifacts.
pub const TARGET_DIR: &str = "target";

/// File name of the generated manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

const APP_DIR: &str = "dbtwatch";
const CONFIG_FILE: &str = "config.json";
const DATABASE_FILE: &str = "dbt_manifest.duckdb";

/// A registered dbt project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Project root directory
    pub path: PathBuf,

    /// `metadata.project_name` of the last manifest seen for this project
    #[serde(default)]
    pub dbt_project_name: Option<String>,
}

impl ProjectEntry {
    /// Directory watched for manifest writes.
    pub fn watch_dir(&self) -> PathBuf {
        self.path.join(TARGET_DIR)
    }

    /// Expected manifest location.
    pub fn manifest_path(&self) -> PathBuf {
        self.watch_dir().join(MANIFEST_FILE)
    }
}

/// Retry settings for watch-triggered ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl IngestSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// The set of tracked projects plus ingestion settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectEntry>,

    #[serde(default)]
    pub ingest: IngestSettings,
}

impl Registry {
    /// Load the registry from `path`, or an empty registry if the file does
    /// not exist yet.
    pub fn load_or_default(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            log::debug!("No registry at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load the registry from `path`.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let registry: Registry =
            serde_json::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        registry.validate()?;
        Ok(registry)
    }

    /// Save the registry atomically (write to a temp file, then rename).
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::IoWithPath {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&temp_path, &json).map_err(|e| CoreError::IoWithPath {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    fn validate(&self) -> CoreResult<()> {
        if self.ingest.max_attempts == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "ingest.max_attempts must be at least 1".to_string(),
            });
        }
        for (name, entry) in &self.projects {
            if name.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "project names cannot be empty".to_string(),
                });
            }
            if let Some((other, other_entry)) = self.overlapping(&entry.path, Some(name)) {
                return Err(CoreError::OverlappingProjects {
                    path: entry.path.display().to_string(),
                    existing: other.to_string(),
                    existing_path: other_entry.path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// First registered project (other than `skip`) whose root contains or is
    /// contained by `path`.
    fn overlapping(&self, path: &Path, skip: Option<&str>) -> Option<(&str, &ProjectEntry)> {
        self.projects
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != skip)
            .find(|(_, entry)| path.starts_with(&entry.path) || entry.path.starts_with(path))
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Register a project. Names must be unique and roots must not nest.
    pub fn add(&mut self, name: &str, entry: ProjectEntry) -> CoreResult<()> {
        if name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "project names cannot be empty".to_string(),
            });
        }
        if self.projects.contains_key(name) {
            return Err(CoreError::DuplicateProject {
                name: name.to_string(),
            });
        }
        if let Some((other, other_entry)) = self.overlapping(&entry.path, None) {
            return Err(CoreError::OverlappingProjects {
                path: entry.path.display().to_string(),
                existing: other.to_string(),
                existing_path: other_entry.path.display().to_string(),
            });
        }
        self.projects.insert(name.to_string(), entry);
        Ok(())
    }

    /// Unregister a project, returning its entry.
    pub fn remove(&mut self, name: &str) -> CoreResult<ProjectEntry> {
        self.projects
            .remove(name)
            .ok_or_else(|| CoreError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    /// Look up a registered project.
    pub fn get(&self, name: &str) -> CoreResult<&ProjectEntry> {
        self.projects
            .get(name)
            .ok_or_else(|| CoreError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    /// Record the manifest's project name for a registered project.
    pub fn set_dbt_project_name(&mut self, name: &str, dbt_project_name: &str) -> bool {
        match self.projects.get_mut(name) {
            Some(entry) if entry.dbt_project_name.as_deref() != Some(dbt_project_name) => {
                entry.dbt_project_name = Some(dbt_project_name.to_string());
                true
            }
            _ => false,
        }
    }
}

/// Default registry location: `<config_dir>/dbtwatch/config.json`.
pub fn default_config_path() -> CoreResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| CoreError::ConfigInvalid {
            message: "could not determine the user config directory".to_string(),
        })
}

/// Default store location: `<data_dir>/dbtwatch/dbt_manifest.duckdb`.
pub fn default_database_path() -> CoreResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(DATABASE_FILE))
        .ok_or_else(|| CoreError::ConfigInvalid {
            message: "could not determine the user data directory".to_string(),
        })
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
