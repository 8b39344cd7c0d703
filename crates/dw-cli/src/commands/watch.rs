//! Long-running watch loop.

use crate::cli::GlobalArgs;
use crate::commands::common;
use anyhow::Result;

/// Watch every registered project until Ctrl-C.
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let mut ctx = common::open_context(global)?;
    if ctx.projects().is_empty() {
        anyhow::bail!("No projects registered. Add one with `dw add <name> <path>`.");
    }

    ctx.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await;
    Ok(())
}
