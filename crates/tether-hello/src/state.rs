//! Lifecycle hooks for the hello component.
//!
//! Hooks run with the component directory as the working directory and
//! record what happened in `hello-state.json` there.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tether_client::LifecycleHooks;

const STATE_FILE: &str = "hello-state.json";

/// What the hooks have recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HelloState {
    /// Version the state was last written for.
    pub(crate) version: String,
    /// Version transitions seen, oldest first, as `"from -> to"`.
    #[serde(default)]
    pub(crate) migrations: Vec<String>,
}

impl HelloState {
    fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes).with_context(|| {
                format!("{} is not valid hello state", path.display())
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Hooks that keep [`HelloState`] in `dir`.
pub(crate) struct HelloHooks {
    dir: PathBuf,
}

impl HelloHooks {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }
}

#[async_trait]
impl LifecycleHooks for HelloHooks {
    async fn init(&self) -> Result<()> {
        let state = HelloState {
            version: env!("CARGO_PKG_VERSION").to_string(),
            migrations: Vec::new(),
        };
        state.save(&self.state_path())
    }

    async fn reconfigure(&self, current_version: &str, new_version: &str) -> Result<()> {
        let path = self.state_path();
        let mut state = HelloState::load(&path)?.unwrap_or_default();
        if !state.version.is_empty() && state.version != current_version {
            tracing::warn!(
                recorded = %state.version,
                current = %current_version,
                "Recorded version differs from the one being replaced"
            );
        }
        state
            .migrations
            .push(format!("{current_version} -> {new_version}"));
        state.version = new_version.to_string();
        state.save(&path)
    }

    async fn cleanup(&self) -> Result<()> {
        match std::fs::remove_file(self.state_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("failed to remove hello state"),
        }
    }
}
