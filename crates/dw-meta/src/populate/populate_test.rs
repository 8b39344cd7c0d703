use super::*;
use crate::MetaDb;

const SHOP: &str = r#"{"metadata":{"project_name":"shop"},"nodes":{"model.shop.orders":{"name":"orders","resource_type":"model","config":{"enabled":true,"materialized":"table"},"columns":{"id":{"data_type":"integer"}},"depends_on":{"nodes":["model.shop.raw_orders"]}}}}"#;

fn manifest(json: &str) -> Manifest {
    Manifest::from_json(json).unwrap()
}

fn count(db: &MetaDb, sql: &str) -> i64 {
    db.conn()
        .query_row(sql, [], |row| row.get::<_, i64>(0))
        .unwrap()
}

/// Every manifest table as sorted string rows, for whole-store comparisons.
fn snapshot(db: &MetaDb) -> Vec<(String, Vec<Vec<String>>)> {
    crate::query::dump(db.conn(), 10_000)
        .unwrap()
        .into_iter()
        .filter(|t| t.name != "project_ingest" && t.name != "schema_version")
        .map(|mut t| {
            t.rows.sort();
            (t.name, t.rows)
        })
        .collect()
}

#[test]
fn example_manifest_rows() {
    let db = MetaDb::open_memory().unwrap();
    let stats = db.upsert_manifest(&manifest(SHOP)).unwrap();

    assert_eq!(
        stats,
        UpsertStats {
            nodes: 1,
            columns: 1,
            references: 0,
            sources: 0,
            dependencies: 1,
        }
    );

    let tables = snapshot(&db);
    let rows = |name: &str| tables.iter().find(|(t, _)| t == name).unwrap().1.clone();

    assert_eq!(rows("project"), vec![vec!["shop"]]);
    assert_eq!(
        rows("node"),
        vec![vec!["model.shop.orders", "orders", "model", "shop"]]
    );
    assert_eq!(
        rows("config"),
        vec![vec!["model.shop.orders", "true", "table", "null", "null", "null", "null"]]
    );
    assert_eq!(
        rows("node_columns"),
        vec![vec!["model.shop.orders", "id", "integer"]]
    );
    assert_eq!(
        rows("dependencies"),
        vec![vec!["model.shop.orders", "model.shop.raw_orders"]]
    );
    assert!(rows("node_references").is_empty());
    assert!(rows("node_sources").is_empty());
}

#[test]
fn upsert_is_idempotent() {
    let db = MetaDb::open_memory().unwrap();
    let m = manifest(SHOP);

    db.upsert_manifest(&m).unwrap();
    let first = snapshot(&db);
    db.upsert_manifest(&m).unwrap();
    let second = snapshot(&db);

    assert_eq!(first, second);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.project_ingest"), 1);
}

#[test]
fn repeated_upserts_of_a_changing_manifest() {
    let db = MetaDb::open_memory().unwrap();
    let m = manifest(SHOP);
    for _ in 0..3 {
        db.upsert_manifest(&m).unwrap();
    }

    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"shop"},"nodes":{"model.shop.orders":{"name":"orders_v2","resource_type":"snapshot",
            "config":{"enabled":false},"columns":{"id":{"data_type":"bigint"}}}}}"#,
    ))
    .unwrap();
    db.upsert_manifest(&m).unwrap();

    let node = crate::query::execute_query(
        db.conn(),
        "SELECT name, resource_type FROM dw_meta.node",
    )
    .unwrap();
    assert_eq!(node.rows, vec![vec!["orders", "model"]]);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.config WHERE enabled"), 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.dependencies"), 1);
    assert_eq!(
        count(&db, "SELECT node_count FROM dw_meta.project_ingest WHERE project_name = 'shop'"),
        1
    );
}

#[test]
fn node_renamed_in_place_keeps_its_key() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(SHOP)).unwrap();
    db.upsert_manifest(&manifest(
        &SHOP.replace(r#""name":"orders""#, r#""name":"all_orders""#),
    ))
    .unwrap();

    let name: String = db
        .conn()
        .query_row(
            "SELECT name FROM dw_meta.node WHERE id = 'model.shop.orders'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "all_orders");
}

#[test]
fn dropped_node_leaves_no_orphans() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"shop"},"nodes":{
            "model.shop.a":{"name":"a","resource_type":"model","config":{"enabled":true},
                "columns":{"id":{"data_type":"int"}},"refs":[{"name":"b"}],
                "sources":[["raw","a"]],"depends_on":{"nodes":["model.shop.b"]}},
            "model.shop.b":{"name":"b","resource_type":"model"}}}"#,
    ))
    .unwrap();

    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"shop"},"nodes":{
            "model.shop.b":{"name":"b","resource_type":"model"}}}"#,
    ))
    .unwrap();

    for table in ["config", "node_columns", "node_references", "node_sources", "dependencies"] {
        let sql = format!("SELECT COUNT(*) FROM dw_meta.{table} WHERE node_id = 'model.shop.a'");
        assert_eq!(count(&db, &sql), 0, "orphan rows left in {table}");
    }
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node"), 1);
}

#[test]
fn shrinking_child_set_removes_stale_rows() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"shop"},"nodes":{"model.shop.a":{"name":"a","resource_type":"model",
            "columns":{"id":{"data_type":"int"},"name":{"data_type":"varchar"}}}}}"#,
    ))
    .unwrap();
    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"shop"},"nodes":{"model.shop.a":{"name":"a","resource_type":"model",
            "columns":{"id":{"data_type":"bigint"}}}}}"#,
    ))
    .unwrap();

    let result = crate::query::execute_query(
        db.conn(),
        "SELECT column_name, data_type FROM dw_meta.node_columns",
    )
    .unwrap();
    assert_eq!(result.rows, vec![vec!["id", "bigint"]]);
}

#[test]
fn duplicate_children_are_stored_once() {
    let db = MetaDb::open_memory().unwrap();
    let stats = db
        .upsert_manifest(&manifest(
            r#"{"metadata":{"project_name":"shop"},"nodes":{"model.shop.a":{"name":"a","resource_type":"model",
                "refs":[{"name":"b"},{"name":"b"}],
                "sources":[["raw","orders"],["raw","orders"],["raw","users"]],
                "depends_on":{"nodes":["source.shop.raw.orders","source.shop.raw.orders"]}}}}"#,
        ))
        .unwrap();

    assert_eq!(stats.sources, 2);
    assert_eq!(stats.references, 1);
    assert_eq!(stats.dependencies, 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node_sources"), 2);
}

#[test]
fn projects_are_isolated() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(SHOP)).unwrap();
    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"finance"},"nodes":{"model.finance.ledger":{"name":"ledger","resource_type":"model"}}}"#,
    ))
    .unwrap();

    db.upsert_manifest(&manifest(r#"{"metadata":{"project_name":"finance"},"nodes":{}}"#))
        .unwrap();

    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM dw_meta.node WHERE project_name = 'shop'"),
        1
    );
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM dw_meta.node WHERE project_name = 'finance'"),
        0
    );
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.project"), 2);
}

#[test]
fn node_id_owned_by_another_project_is_rejected() {
    let db = MetaDb::open_memory().unwrap();
    let shared = |project: &str| {
        format!(
            r#"{{"metadata":{{"project_name":"{project}"}},"nodes":{{"model.dbt_utils.calendar":{{"name":"calendar","resource_type":"model"}}}}}}"#
        )
    };
    db.upsert_manifest(&manifest(&shared("shop"))).unwrap();
    let before = snapshot(&db);

    let err = db.upsert_manifest(&manifest(&shared("finance"))).unwrap_err();

    assert!(matches!(err, crate::MetaError::PopulationError(_)));
    assert!(err.to_string().contains("model.dbt_utils.calendar"));
    assert_eq!(snapshot(&db), before);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.project"), 1);
}

#[test]
fn failed_upsert_keeps_previous_snapshot() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(SHOP)).unwrap();
    let before = snapshot(&db);

    let result = db.transaction(|conn| {
        upsert_manifest(conn, &manifest(r#"{"metadata":{"project_name":"shop"},"nodes":{}}"#))?;
        Err::<(), _>(crate::MetaError::PopulationError("injected".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(snapshot(&db), before);
}

#[test]
fn delete_project_purges_all_rows() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(SHOP)).unwrap();
    db.upsert_manifest(&manifest(
        r#"{"metadata":{"project_name":"finance"},"nodes":{"model.finance.ledger":{"name":"ledger","resource_type":"model"}}}"#,
    ))
    .unwrap();

    assert!(db.delete_project("shop").unwrap());
    assert!(!db.delete_project("shop").unwrap());

    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.project"), 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node"), 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.config"), 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node_columns"), 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.dependencies"), 0);
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM dw_meta.project_ingest WHERE project_name = 'shop'"),
        0
    );
}

#[test]
fn project_can_be_stored_again_after_delete() {
    let db = MetaDb::open_memory().unwrap();
    db.upsert_manifest(&manifest(SHOP)).unwrap();
    assert!(db.delete_project("shop").unwrap());

    db.upsert_manifest(&manifest(SHOP)).unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node"), 1);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.config"), 1);
}

#[test]
fn file_store_upserts_twice_and_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.duckdb");
    let m = manifest(SHOP);
    {
        let db = MetaDb::open(&path).unwrap();
        db.upsert_manifest(&m).unwrap();
        db.upsert_manifest(&m).unwrap();
    }
    let db = MetaDb::open(&path).unwrap();
    db.upsert_manifest(&m).unwrap();
    assert!(db.delete_project("shop").unwrap());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM dw_meta.node"), 0);
}
