//! Component management commands - list, install, update, rollback,
//! uninstall and development builds.

use std::path::PathBuf;

use anyhow::Context;
use tether_components::{Artifact, ComponentCapabilities, ComponentStatus};
use tether_core::ComponentName;

use super::HostContext;
use crate::theme::{Theme, format_size};

fn artifact(
    path: PathBuf,
    version: &str,
    digest: Option<String>,
) -> anyhow::Result<Artifact> {
    let path = path
        .canonicalize()
        .with_context(|| format!("executable not found: {}", path.display()))?;
    let mut artifact = Artifact::parse(path, version)?;
    if let Some(digest) = digest {
        artifact = artifact.with_digest(digest);
    }
    Ok(artifact)
}

/// List installed components.
pub(crate) fn list(ctx: &HostContext) -> anyhow::Result<()> {
    let components = ctx.manager().list()?;
    if components.is_empty() {
        println!("{}", Theme::info("No components installed"));
        return Ok(());
    }

    println!("{}", Theme::header("Installed Components"));
    println!(
        "  {:<20} {:<14} {:<12} {:>10}",
        "NAME", "VERSION", "STATUS", "SIZE"
    );
    println!("{}", Theme::separator());
    for c in &components {
        println!(
            "  {:<20} {:<14} {:<12} {:>10}",
            c.name(),
            c.version(),
            Theme::status(c.status()),
            format_size(c.size())
        );
        if let ComponentStatus::Tainted { reason } = c.status() {
            println!("    {}", Theme::dimmed(reason));
        }
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} component(s)", components.len()))
    );
    Ok(())
}

/// Install `name` from `path`.
pub(crate) async fn install(
    ctx: &HostContext,
    name: &ComponentName,
    path: PathBuf,
    version: &str,
    deprecated: bool,
    digest: Option<String>,
) -> anyhow::Result<()> {
    let artifact = artifact(path, version, digest)?.with_deprecated(deprecated);
    let component = ctx
        .manager()
        .install(name, &artifact)
        .await
        .with_context(|| format!("failed to install {name}"))?;

    println!("{}", Theme::success(&format!("Installed {}", component.summary())));
    println!(
        "{}",
        Theme::kv("Location", &component.directory().display().to_string())
    );
    Ok(())
}

/// Update `name` to the executable at `path`.
pub(crate) async fn update(
    ctx: &HostContext,
    name: &ComponentName,
    path: PathBuf,
    version: &str,
    digest: Option<String>,
) -> anyhow::Result<()> {
    let artifact = artifact(path, version, digest)?;
    let component = ctx
        .manager()
        .update(name, &artifact)
        .await
        .with_context(|| format!("failed to update {name}"))?;
    println!("{}", Theme::success(&format!("Updated to {}", component.summary())));
    Ok(())
}

/// Roll `name` back, to the kept previous version or to `target`.
pub(crate) async fn rollback(
    ctx: &HostContext,
    name: &ComponentName,
    target: Option<(PathBuf, String)>,
) -> anyhow::Result<()> {
    let mut manager = ctx.manager();
    let component = match target {
        Some((path, version)) => {
            let artifact = artifact(path, &version, None)?;
            manager.rollback_to(name, &artifact).await
        },
        None => manager.rollback(name).await,
    }
    .with_context(|| format!("failed to roll back {name}"))?;
    println!(
        "{}",
        Theme::success(&format!("Rolled back to {}", component.summary()))
    );
    Ok(())
}

/// Uninstall `name`.
pub(crate) async fn uninstall(ctx: &HostContext, name: &ComponentName) -> anyhow::Result<()> {
    ctx.manager()
        .uninstall(name)
        .await
        .with_context(|| format!("failed to uninstall {name}"))?;
    println!("{}", Theme::success(&format!("Uninstalled {name}")));
    Ok(())
}

/// Create or mark `name` as a development component.
pub(crate) fn develop(
    ctx: &HostContext,
    name: &ComponentName,
    description: &str,
) -> anyhow::Result<()> {
    let component = ctx
        .manager()
        .develop(name, description)
        .with_context(|| format!("failed to set up development component {name}"))?;
    println!("{}", Theme::success(&format!("Ready: {}", component.summary())));
    println!(
        "{}",
        Theme::info(&format!(
            "Place the executable at {}",
            component.executable().display()
        ))
    );
    Ok(())
}
