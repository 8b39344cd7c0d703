use super::*;
use dw_core::registry::{MANIFEST_FILE, TARGET_DIR};
use tempfile::TempDir;

const SHOP: &str = r#"{
  "metadata": {"project_name": "shop"},
  "nodes": {
    "model.shop.orders": {
      "name": "orders",
      "resource_type": "model",
      "config": {"enabled": true},
      "columns": {"id": {"name": "id", "data_type": "integer"}}
    },
    "model.shop.customers": {"name": "customers", "resource_type": "model"}
  }
}"#;

struct Fixture {
    home: TempDir,
    ctx: WatchContext,
}

impl Fixture {
    fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let ctx = WatchContext::open(
            &home.path().join("config").join("config.json"),
            Store::memory().unwrap(),
        )
        .unwrap();
        Self { home, ctx }
    }

    fn registry_path(&self) -> PathBuf {
        self.home.path().join("config").join("config.json")
    }

    /// Create a project directory, optionally with a built manifest.
    fn project(&self, dir: &str, manifest: Option<&str>) -> PathBuf {
        let root = self.home.path().join(dir);
        std::fs::create_dir_all(root.join(TARGET_DIR)).unwrap();
        if let Some(text) = manifest {
            std::fs::write(root.join(TARGET_DIR).join(MANIFEST_FILE), text).unwrap();
        }
        root
    }
}

#[test]
fn open_without_registry_file_is_empty() {
    let fx = Fixture::new();
    assert!(fx.ctx.projects().is_empty());
    assert!(!fx.registry_path().exists());
}

#[test]
fn add_project_persists_and_caches_manifest_name() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", Some(SHOP));

    let entry = fx.ctx.add_project("shop-local", &root).unwrap();

    assert_eq!(entry.path, std::fs::canonicalize(&root).unwrap());
    assert_eq!(entry.dbt_project_name.as_deref(), Some("shop"));
    let saved = Registry::load(&fx.registry_path()).unwrap();
    assert_eq!(saved.projects["shop-local"], entry);
}

#[test]
fn add_project_without_manifest_has_no_cached_name() {
    let mut fx = Fixture::new();
    let root = fx.project("fresh", None);

    let entry = fx.ctx.add_project("fresh", &root).unwrap();
    assert_eq!(entry.dbt_project_name, None);
}

#[test]
fn add_project_rejects_duplicates_and_nesting() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", None);
    let nested = fx.project("shop/packages/utils", None);
    fx.ctx.add_project("shop", &root).unwrap();

    let other = fx.project("other", None);
    let dup = fx.ctx.add_project("shop", &other).unwrap_err();
    assert!(matches!(dup, ContextError::Registry(CoreError::DuplicateProject { .. })));

    let overlap = fx.ctx.add_project("utils", &nested).unwrap_err();
    assert!(matches!(
        overlap,
        ContextError::Registry(CoreError::OverlappingProjects { .. })
    ));
    assert_eq!(fx.ctx.projects().len(), 1);
}

#[test]
fn add_project_rejects_missing_path() {
    let mut fx = Fixture::new();
    let ghost = fx.home.path().join("does-not-exist");
    let err = fx.ctx.add_project("ghost", &ghost).unwrap_err();
    assert!(matches!(err, ContextError::Registry(CoreError::IoWithPath { .. })));
}

#[test]
fn failed_registry_save_leaves_project_unregistered() {
    let home = tempfile::tempdir().unwrap();
    let blocker = home.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut ctx =
        WatchContext::open(&blocker.join("config.json"), Store::memory().unwrap()).unwrap();
    let root = home.path().join("shop");
    std::fs::create_dir_all(root.join(TARGET_DIR)).unwrap();

    assert!(ctx.add_project("shop", &root).is_err());
    assert!(ctx.projects().is_empty());
    assert!(ctx.start().is_empty());
    assert!(ctx.detector().watched_projects().is_empty());
}

#[test]
fn preview_parses_without_storing() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", Some(SHOP));
    fx.ctx.add_project("shop", &root).unwrap();

    let manifest = fx.ctx.preview("shop").unwrap();

    assert_eq!(manifest.node_count(), 2);
    assert!(fx.ctx.stored_projects().unwrap().is_empty());
}

#[tokio::test]
async fn refresh_ingests_current_manifest() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", None);
    fx.ctx.add_project("shop-local", &root).unwrap();
    std::fs::write(root.join(TARGET_DIR).join(MANIFEST_FILE), SHOP).unwrap();

    let report = fx.ctx.refresh("shop-local").await.unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.stats.nodes, 2);
    assert_eq!(report.stats.columns, 1);
    let stored = fx.ctx.stored_projects().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].project_name, "shop");
    assert_eq!(stored[0].node_count, 2);
    assert!(stored[0].last_ingested_at.is_some());

    let saved = Registry::load(&fx.registry_path()).unwrap();
    assert_eq!(
        saved.projects["shop-local"].dbt_project_name.as_deref(),
        Some("shop")
    );
}

#[tokio::test]
async fn refresh_reports_missing_manifest_and_unknown_project() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", None);
    fx.ctx.add_project("shop", &root).unwrap();

    let missing = fx.ctx.refresh("shop").await.unwrap_err();
    assert!(matches!(missing, IngestError::NotFound { .. }));
    assert!(missing.to_string().contains("I001"));

    let unknown = fx.ctx.refresh("nope").await.unwrap_err();
    assert!(matches!(unknown, IngestError::UnknownProject { .. }));
}

#[tokio::test]
async fn refresh_of_malformed_manifest_keeps_previous_snapshot() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", Some(SHOP));
    fx.ctx.add_project("shop", &root).unwrap();
    fx.ctx.refresh("shop").await.unwrap();

    std::fs::write(root.join(TARGET_DIR).join(MANIFEST_FILE), "{\"nodes\": {").unwrap();
    let err = fx.ctx.refresh("shop").await.unwrap_err();

    assert!(matches!(err, IngestError::Exhausted { attempts: 1, .. }));
    assert_eq!(fx.ctx.stored_projects().unwrap()[0].node_count, 2);
}

#[tokio::test]
async fn remove_keeps_rows_unless_purged() {
    let mut fx = Fixture::new();
    let shop = fx.project("shop", Some(SHOP));
    let other_manifest = SHOP.replace("shop", "other");
    let other = fx.project("other", Some(other_manifest.as_str()));
    fx.ctx.add_project("shop", &shop).unwrap();
    fx.ctx.add_project("other", &other).unwrap();
    fx.ctx.refresh("shop").await.unwrap();
    fx.ctx.refresh("other").await.unwrap();

    let kept = fx.ctx.remove_project("shop", false).unwrap();
    assert!(!kept.purged);
    assert_eq!(fx.ctx.stored_projects().unwrap().len(), 2);

    let purged = fx.ctx.remove_project("other", true).unwrap();
    assert!(purged.purged);
    let stored = fx.ctx.stored_projects().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].project_name, "shop");

    assert!(fx.ctx.projects().is_empty());
    assert!(Registry::load(&fx.registry_path()).unwrap().projects.is_empty());
}

#[tokio::test]
async fn purge_refused_while_another_registration_shares_the_rows() {
    let mut fx = Fixture::new();
    let first = fx.project("shop", Some(SHOP));
    let copy = fx.project("shop-copy", Some(SHOP));
    fx.ctx.add_project("shop", &first).unwrap();
    fx.ctx.add_project("shop-copy", &copy).unwrap();
    fx.ctx.refresh("shop").await.unwrap();

    let err = fx.ctx.remove_project("shop-copy", true).unwrap_err();

    match &err {
        ContextError::SharedRows {
            project,
            dbt_project_name,
            other,
        } => {
            assert_eq!(project, "shop-copy");
            assert_eq!(dbt_project_name, "shop");
            assert_eq!(other, "shop");
        }
        other => panic!("expected SharedRows, got {other:?}"),
    }
    assert!(err.to_string().contains("C001"));
    assert_eq!(fx.ctx.projects().len(), 2);
    assert_eq!(fx.ctx.stored_projects().unwrap()[0].node_count, 2);

    let removed = fx.ctx.remove_project("shop-copy", false).unwrap();
    assert!(!removed.purged);
    assert_eq!(fx.ctx.stored_projects().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_registry_save_keeps_rows_and_registration() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", Some(SHOP));
    fx.ctx.add_project("shop", &root).unwrap();
    fx.ctx.refresh("shop").await.unwrap();

    let config_dir = fx.home.path().join("config");
    std::fs::remove_dir_all(&config_dir).unwrap();
    std::fs::write(&config_dir, "not a directory").unwrap();

    let err = fx.ctx.remove_project("shop", true).unwrap_err();

    assert!(matches!(err, ContextError::Registry(CoreError::IoWithPath { .. })));
    assert!(fx.ctx.projects().contains_key("shop"));
    assert_eq!(fx.ctx.stored_projects().unwrap().len(), 1);
}

#[test]
fn sync_registry_picks_up_edits_from_elsewhere() {
    let mut fx = Fixture::new();
    let shop = fx.project("shop", None);
    let finance = fx.project("finance", None);
    fx.ctx.add_project("shop", &shop).unwrap();
    assert!(fx.ctx.start().is_empty());
    assert!(!fx.ctx.sync_registry().unwrap());

    // Another process replaces shop with finance.
    let mut edited = Registry::load(&fx.registry_path()).unwrap();
    edited.remove("shop").unwrap();
    edited
        .add(
            "finance",
            ProjectEntry {
                path: std::fs::canonicalize(&finance).unwrap(),
                dbt_project_name: None,
            },
        )
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    edited.save(&fx.registry_path()).unwrap();

    assert!(fx.ctx.sync_registry().unwrap());
    assert_eq!(fx.ctx.detector().watched_projects(), vec!["finance".to_string()]);
    assert!(fx.ctx.projects().contains_key("finance"));
    assert!(!fx.ctx.projects().contains_key("shop"));
    assert!(!fx.ctx.sync_registry().unwrap());
    fx.ctx.stop();
}

#[test]
fn remove_unknown_project_fails() {
    let mut fx = Fixture::new();
    let err = fx.ctx.remove_project("nope", true).unwrap_err();
    assert!(matches!(err, ContextError::Registry(CoreError::ProjectNotFound { .. })));
}

#[test]
fn reopen_tracks_saved_projects() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", None);
    fx.ctx.add_project("shop", &root).unwrap();

    let mut reopened =
        WatchContext::open(&fx.registry_path(), Store::memory().unwrap()).unwrap();

    assert_eq!(reopened.projects().len(), 1);
    assert!(reopened.start().is_empty());
    assert!(reopened.detector().is_watching("shop"));
    reopened.stop();
    assert!(!reopened.detector().is_watching("shop"));
}

#[tokio::test]
async fn run_returns_on_shutdown_and_can_run_again() {
    let mut fx = Fixture::new();
    let root = fx.project("shop", None);
    fx.ctx.add_project("shop", &root).unwrap();

    fx.ctx.run(async {}).await;
    assert!(fx.ctx.detector().watched_projects().is_empty());

    fx.ctx.run(async {}).await;
    assert!(fx.ctx.detector().watched_projects().is_empty());
}
