//! dbtwatch CLI - keep dbt manifests queryable in DuckDB

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use commands::{project, refresh, store, watch};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.global.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        cli::Commands::Add(args) => project::execute_add(args, &cli.global),
        cli::Commands::Remove(args) => project::execute_remove(args, &cli.global),
        cli::Commands::List(args) => project::execute_list(args, &cli.global),
        cli::Commands::Preview(args) => project::execute_preview(args, &cli.global),
        cli::Commands::Refresh(args) => refresh::execute(args, &cli.global).await,
        cli::Commands::Dump(args) => store::execute_dump(args, &cli.global),
        cli::Commands::Tables => store::execute_tables(&cli.global),
        cli::Commands::Query(args) => store::execute_query(args, &cli.global),
        cli::Commands::Watch => watch::execute(&cli.global).await,
    }
}
