//! Project registry commands: add, remove, list, preview.

use crate::cli::{AddArgs, GlobalArgs, ListArgs, ProjectArg, RemoveArgs};
use crate::commands::{common, table};
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Register a project and report what was found.
pub(crate) fn execute_add(args: &AddArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = common::open_context(global)?;
    let entry = ctx
        .add_project(&args.name, &args.path)
        .with_context(|| format!("Failed to add project '{}'", args.name))?;

    println!("Added project '{}' at {}", args.name, entry.path.display());
    match &entry.dbt_project_name {
        Some(dbt_name) => println!("  manifest project: {dbt_name}"),
        None => println!("  no manifest yet; run `dbt parse` to generate one"),
    }
    if !entry.watch_dir().is_dir() {
        println!(
            "  {} does not exist yet; `dw watch` will skip this project until it does",
            entry.watch_dir().display()
        );
    }
    Ok(())
}

/// Unregister a project, optionally deleting its stored rows.
pub(crate) fn execute_remove(args: &RemoveArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = common::open_context(global)?;
    let removed = ctx
        .remove_project(&args.name, args.purge)
        .with_context(|| format!("Failed to remove project '{}'", args.name))?;

    println!("Removed project '{}'", removed.name);
    if removed.purged {
        println!("  stored rows deleted");
    } else if args.purge {
        println!("  nothing stored for this project");
    }
    Ok(())
}

/// Registered projects joined with what the store holds for each.
pub(crate) fn execute_list(args: &ListArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = common::open_context(global)?;
    let stored: HashMap<String, dw_meta::ProjectSummary> = ctx
        .stored_projects()
        .context("Failed to read stored projects")?
        .into_iter()
        .map(|p| (p.project_name.clone(), p))
        .collect();

    let rows: Vec<Vec<String>> = ctx
        .projects()
        .iter()
        .map(|(name, entry)| {
            let summary = entry
                .dbt_project_name
                .as_deref()
                .and_then(|dbt_name| stored.get(dbt_name));
            vec![
                name.clone(),
                entry.path.display().to_string(),
                entry.dbt_project_name.clone().unwrap_or_else(|| "-".to_string()),
                summary.map_or_else(|| "-".to_string(), |s| s.node_count.to_string()),
                summary
                    .and_then(|s| s.last_ingested_at.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let headers = ["NAME", "PATH", "DBT_PROJECT", "NODES", "LAST_INGESTED"];
    if args.json {
        let columns: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let output = serde_json::to_string_pretty(&common::rows_to_json(&columns, &rows))
            .context("Failed to serialize JSON output")?;
        println!("{output}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No projects registered. Add one with `dw add <name> <path>`.");
        return Ok(());
    }
    table::print(&headers, &rows);
    Ok(())
}

/// Parse the project's manifest and print a per-resource-type summary.
pub(crate) fn execute_preview(args: &ProjectArg, global: &GlobalArgs) -> Result<()> {
    let ctx = common::open_context(global)?;
    let manifest = ctx
        .preview(&args.name)
        .with_context(|| format!("Failed to preview project '{}'", args.name))?;
    let summary = manifest.summary();

    println!(
        "Manifest project '{}': {} nodes\n",
        summary.project_name, summary.node_count
    );
    let rows: Vec<Vec<String>> = summary
        .by_resource_type
        .iter()
        .map(|(resource_type, count)| vec![resource_type.clone(), count.to_string()])
        .collect();
    table::print(&["RESOURCE_TYPE", "COUNT"], &rows);
    Ok(())
}
