use super::*;

#[test]
fn fresh_connection_reaches_latest_version() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();

    let latest = MIGRATIONS.iter().map(|m| m.version).max().unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest);
}

#[test]
fn rerunning_applies_nothing() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM dw_meta.schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, MIGRATIONS.len() as i64);
}

#[test]
fn failed_migration_leaves_no_version_row() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(VERSION_TABLE).unwrap();
    let broken = Migration {
        version: 99,
        sql: "CREATE TABLE dw_meta.half_done (id INTEGER); SELECT * FROM dw_meta.missing_table;",
    };

    let err = apply(&conn, &broken).unwrap_err();

    assert!(matches!(err, MetaError::MigrationError(_)));
    assert_eq!(schema_version(&conn).unwrap(), 0);
    let leftover: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'half_done'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(leftover, 0);
    conn.execute_batch("SELECT 1").unwrap();
}
