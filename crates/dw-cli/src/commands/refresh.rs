//! Manual ingestion of one project's current manifest.

use crate::cli::{GlobalArgs, ProjectArg};
use crate::commands::common;
use anyhow::{Context, Result};

/// Execute the refresh command.
pub(crate) async fn execute(args: &ProjectArg, global: &GlobalArgs) -> Result<()> {
    let mut ctx = common::open_context(global)?;
    let report = ctx
        .refresh(&args.name)
        .await
        .with_context(|| format!("Failed to refresh project '{}'", args.name))?;

    let stats = report.stats;
    println!(
        "Ingested '{}' (manifest project '{}')",
        report.project, report.dbt_project_name
    );
    println!(
        "  {} nodes, {} columns, {} references, {} sources, {} dependencies",
        stats.nodes, stats.columns, stats.references, stats.sources, stats.dependencies
    );
    Ok(())
}
