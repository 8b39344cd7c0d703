//! Store inspection commands: dump, tables, query.

use crate::cli::{DumpArgs, GlobalArgs, QueryArgs};
use crate::commands::{common, table};
use anyhow::{Context, Result};

/// Print every store table with up to `--rows` sample rows.
pub(crate) fn execute_dump(args: &DumpArgs, global: &GlobalArgs) -> Result<()> {
    let db = common::open_store(global)?;
    let tables = db.dump(args.rows).context("Failed to dump store")?;

    for (i, dumped) in tables.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "dw_meta.{} ({} rows, showing {})",
            dumped.name,
            dumped.total_rows,
            dumped.rows.len()
        );
        if dumped.rows.is_empty() {
            continue;
        }
        let headers: Vec<&str> = dumped.columns.iter().map(|s| s.as_str()).collect();
        table::print(&headers, &dumped.rows);
    }
    Ok(())
}

/// List store tables with row counts.
pub(crate) fn execute_tables(global: &GlobalArgs) -> Result<()> {
    let db = common::open_store(global)?;
    let conn = db.conn();
    let tables = dw_meta::query::list_tables(conn).context("Failed to list store tables")?;

    println!("Store tables ({}):\n", tables.len());
    for table in &tables {
        let count = dw_meta::query::table_row_count(conn, table)
            .with_context(|| format!("Failed to count rows in {table}"))?;
        println!("  {:<40} {:>6} rows", table, count);
    }
    Ok(())
}

/// Run ad-hoc SQL against the store.
pub(crate) fn execute_query(args: &QueryArgs, global: &GlobalArgs) -> Result<()> {
    let db = common::open_store(global)?;
    let result =
        dw_meta::query::execute_query(db.conn(), &args.sql).context("Failed to execute query")?;

    if args.json {
        let output = serde_json::to_string_pretty(&common::rows_to_json(
            &result.columns,
            &result.rows,
        ))
        .context("Failed to serialize JSON output")?;
        println!("{output}");
        return Ok(());
    }

    if result.rows.is_empty() {
        println!("(0 rows)");
        return Ok(());
    }
    let headers: Vec<&str> = result.columns.iter().map(|s| s.as_str()).collect();
    table::print(&headers, &result.rows);
    println!("\n({} rows)", result.rows.len());
    Ok(())
}
