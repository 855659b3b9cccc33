//! Directory layout for the Tether host.
//!
//! # Layout
//!
//! ```text
//! ~/.tether/                      (TetherHome)
//! ├── components/                   (installed components)
//! │   ├── components.lock           (install records, blake3 digests)
//! │   └── <name>/                   (one directory per component)
//! ├── cache.db/                     (SurrealKV - component cache)
//! ├── logs/                         (host log files)
//! └── tether.toml                   (host config)
//! ```

use std::path::{Path, PathBuf};

use crate::env;
use crate::error::{CoreError, CoreResult};

/// Global Tether home directory (`~/.tether/` or `$TETHER_HOME`).
#[derive(Debug, Clone)]
pub struct TetherHome {
    root: PathBuf,
}

impl TetherHome {
    /// Resolve the home directory.
    ///
    /// Checks `$TETHER_HOME` first, then falls back to `~/.tether/`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Home`] if `$TETHER_HOME` is relative or no user
    /// home directory can be determined.
    pub fn resolve() -> CoreResult<Self> {
        if let Ok(custom) = std::env::var(env::HOME) {
            let root = PathBuf::from(custom);
            if !root.is_absolute() {
                return Err(CoreError::Home(format!(
                    "{} must be an absolute path",
                    env::HOME
                )));
            }
            return Ok(Self { root });
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| CoreError::Home("could not determine user home directory".into()))?;
        Ok(Self {
            root: base.home_dir().join(".tether"),
        })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.components_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(self.root(), std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Installed components (`~/.tether/components/`).
    #[must_use]
    pub fn components_dir(&self) -> PathBuf {
        self.root.join("components")
    }

    /// Persistent cache store (`~/.tether/cache.db/`).
    #[must_use]
    pub fn cache_db_path(&self) -> PathBuf {
        self.root.join("cache.db")
    }

    /// Log directory (`~/.tether/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Host configuration file (`~/.tether/tether.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("tether.toml")
    }
}
