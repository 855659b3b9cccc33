//! Cache maintenance commands.

use anyhow::Context;
use tether_components::ComponentCapabilities;
use tether_core::ComponentName;
use tether_host::open_store;
use tether_host::services::cache::{clear_all, prune_all};

use super::HostContext;
use crate::theme::Theme;

fn component_names(ctx: &HostContext) -> anyhow::Result<Vec<ComponentName>> {
    Ok(ctx
        .manager()
        .list()?
        .iter()
        .map(|c| c.name().clone())
        .collect())
}

/// Remove every entry in the cache.
pub(crate) async fn clear(ctx: &HostContext) -> anyhow::Result<()> {
    let names = component_names(ctx)?;
    let store = open_store(&ctx.config, &ctx.home).context("failed to open cache store")?;
    let removed = clear_all(&store, &names).await;
    store.close().await?;
    let removed = removed?;
    println!(
        "{}",
        Theme::success(&format!("Removed {removed} cache entr{}", plural(removed)))
    );
    Ok(())
}

/// Remove expired and unreadable cache entries.
pub(crate) async fn prune(ctx: &HostContext) -> anyhow::Result<()> {
    let names = component_names(ctx)?;
    let store = open_store(&ctx.config, &ctx.home).context("failed to open cache store")?;
    let removed = prune_all(&store, &names).await;
    store.close().await?;
    let removed = removed?;
    println!(
        "{}",
        Theme::success(&format!("Pruned {removed} stale cache entr{}", plural(removed)))
    );
    Ok(())
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "y" } else { "ies" }
}
