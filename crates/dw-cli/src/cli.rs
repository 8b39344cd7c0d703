//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// dbtwatch - keep the latest manifest of every dbt project in DuckDB
#[derive(Parser, Debug)]
#[command(name = "dw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override project registry path
    #[arg(short, long, global = true, env = "DW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override DuckDB database path
    #[arg(short, long, global = true, env = "DW_DATABASE")]
    pub database: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a dbt project for watching
    Add(AddArgs),

    /// Unregister a dbt project
    Remove(RemoveArgs),

    /// List registered projects and what is stored for them
    List(ListArgs),

    /// Parse a project's manifest and summarize it without storing
    Preview(ProjectArg),

    /// Ingest a project's current manifest now
    Refresh(ProjectArg),

    /// Print every store table with sample rows
    Dump(DumpArgs),

    /// List store tables with row counts
    Tables,

    /// Run a SQL query against the store
    Query(QueryArgs),

    /// Watch all registered projects until interrupted
    Watch,
}

/// Arguments for the add command
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Name to register the project under
    pub name: String,

    /// dbt project root directory
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for the remove command
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Registered project name
    pub name: String,

    /// Also delete the project's stored rows
    #[arg(long)]
    pub purge: bool,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// A single registered project
#[derive(Args, Debug)]
pub struct ProjectArg {
    /// Registered project name
    pub name: String,
}

/// Arguments for the dump command
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Sample rows per table
    #[arg(short = 'n', long, default_value_t = dw_meta::connection::DEFAULT_DUMP_ROWS)]
    pub rows: usize,
}

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// SQL to execute
    pub sql: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
