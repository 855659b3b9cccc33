//! `tether run` - launch a component with host services.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tether_core::ComponentName;
use tether_host::{Launcher, open_sink, open_store};

use super::HostContext;

/// Run `name` with `args` and return its exit code.
pub(crate) async fn run_component(
    ctx: &HostContext,
    name: &ComponentName,
    args: &[String],
) -> anyhow::Result<ExitCode> {
    let component = ctx.manager().get(name)?;
    let store = open_store(&ctx.config, &ctx.home).context("failed to open cache store")?;
    let sink = open_sink(&ctx.config)?;

    let launcher = Launcher::new(ctx.config.clone(), Arc::clone(&store), sink);
    let result = launcher.run(&component, args).await;

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "Failed to close cache store");
    }
    let status = result.with_context(|| format!("failed to run {name}"))?;

    Ok(match status.code() {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        // Terminated by a signal.
        None => ExitCode::FAILURE,
    })
}
