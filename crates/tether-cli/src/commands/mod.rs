//! CLI command implementations.

pub(crate) mod cache;
pub(crate) mod component;
pub(crate) mod run;

use anyhow::Context;
use tether_components::{Catalog, LifecycleManager};
use tether_core::TetherHome;
use tether_host::HostConfig;

/// Resolved home directory and configuration.
pub(crate) struct HostContext {
    pub(crate) home: TetherHome,
    pub(crate) config: HostConfig,
}

impl HostContext {
    /// Resolve `$TETHER_HOME` (or `~/.tether`) and load `tether.toml`.
    pub(crate) fn load() -> anyhow::Result<Self> {
        let home = TetherHome::resolve().context("failed to resolve tether home")?;
        home.ensure()
            .with_context(|| format!("failed to create {}", home.root().display()))?;
        let mut config = HostConfig::load_or_default(home.config_path())
            .with_context(|| format!("failed to load {}", home.config_path().display()))?;
        config.apply_env();
        Ok(Self { home, config })
    }

    /// Lifecycle manager over the installed components.
    pub(crate) fn manager(&self) -> LifecycleManager {
        LifecycleManager::new(
            Catalog::new(self.home.components_dir()),
            self.config.components.hook_runner(),
        )
    }
}
