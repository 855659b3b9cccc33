//! On-disk component discovery.
//!
//! ```text
//! components/
//! ├── components.lock
//! └── <name>/
//!     ├── <name>          executable
//!     ├── .version        semver text
//!     ├── .dev            dev marker (JSON)
//!     └── .previous/      prior version kept for rollback
//!         └── .deprecated  present if that version was deprecated
//! ```

use std::path::{Path, PathBuf};

use semver::Version;
use tether_core::ComponentName;
use tracing::{debug, warn};

use crate::component::{Component, ComponentCapabilities, LifecycleState};
use crate::error::{ComponentError, ComponentResult};
use crate::lockfile::{ComponentLockfile, LOCKFILE_NAME, compute_digest};
use crate::provenance::{DevInfo, Provenance};

/// File holding the installed version.
pub const VERSION_FILE: &str = ".version";

/// Directory holding the version kept for rollback.
pub const PREVIOUS_DIR: &str = ".previous";

/// Marker in [`PREVIOUS_DIR`] for a kept version that was deprecated.
pub const DEPRECATED_MARKER: &str = ".deprecated";

/// Read-only view of the components directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    /// Catalog rooted at `root` (normally `TetherHome::components_dir`).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Components root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the lock file.
    #[must_use]
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    /// Directory of one component.
    #[must_use]
    pub fn component_dir(&self, name: &ComponentName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Rollback directory of one component.
    #[must_use]
    pub fn previous_dir(&self, name: &ComponentName) -> PathBuf {
        self.component_dir(name).join(PREVIOUS_DIR)
    }

    /// Load the lock file.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file exists but is unreadable.
    pub fn lockfile(&self) -> ComponentResult<ComponentLockfile> {
        ComponentLockfile::load_or_default(&self.lockfile_path())
    }

    /// Discover every component on disk, sorted by name.
    ///
    /// Entries that are not valid component names (staging directories,
    /// the lock file) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the root or the lock file cannot be read.
    pub fn discover(&self) -> ComponentResult<Vec<Component>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let lock = self.lockfile()?;

        let mut components = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|s| ComponentName::new(s).ok())
            else {
                continue;
            };
            if let Some(component) = self.load_with(&name, &lock)? {
                components.push(component);
            }
        }
        components.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(root = %self.root.display(), count = components.len(), "Discovered components");
        Ok(components)
    }

    /// Load one component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if it is not on disk.
    pub fn get(&self, name: &ComponentName) -> ComponentResult<Component> {
        let lock = self.lockfile()?;
        self.load_with(name, &lock)?
            .ok_or_else(|| ComponentError::NotFound(name.to_string()))
    }

    fn load_with(
        &self,
        name: &ComponentName,
        lock: &ComponentLockfile,
    ) -> ComponentResult<Option<Component>> {
        let dir = self.component_dir(name);
        if !dir.is_dir() {
            return Ok(None);
        }

        if let Some(info) = DevInfo::load(&dir)? {
            let version = info.semver();
            return Ok(Some(Component::new(
                name.clone(),
                version,
                Provenance::Dev(info),
                dir,
            )));
        }

        let entry = lock.get(name);
        let provenance = if entry.is_some_and(|e| e.deprecated) {
            Provenance::Deprecated
        } else {
            Provenance::Released
        };

        let Some(version) = read_version(&dir) else {
            warn!(component = %name, "Missing or unparseable version file");
            return Ok(Some(
                Component::new(name.clone(), Version::new(0, 0, 0), provenance, dir)
                    .tainted("version file missing or unparseable"),
            ));
        };

        let component = Component::new(name.clone(), version, provenance, dir);
        let Some(entry) = entry else {
            return Ok(Some(component.tainted("not recorded in lock file")));
        };
        if entry.version != *component.version() {
            let reason = format!(
                "version {} differs from locked {}",
                component.version(),
                entry.version
            );
            return Ok(Some(component.tainted(reason)));
        }
        match compute_digest(component.executable()) {
            Ok(digest) if digest == entry.digest => Ok(Some(component)),
            Ok(_) => {
                warn!(component = %name, "Executable digest differs from lock file");
                Ok(Some(component.tainted("digest differs from lock file")))
            },
            Err(e) => {
                warn!(component = %name, error = %e, "Failed to hash executable");
                Ok(Some(component.tainted("executable unreadable")))
            },
        }
    }

    /// The version kept for rollback, if any.
    #[must_use]
    pub fn previous(&self, name: &ComponentName) -> Option<(PathBuf, Version)> {
        let dir = self.previous_dir(name);
        let executable = dir.join(name.as_str());
        if !executable.is_file() {
            return None;
        }
        read_version(&dir).map(|v| (executable, v))
    }

    /// Whether the version kept for rollback was installed as deprecated.
    #[must_use]
    pub fn previous_deprecated(&self, name: &ComponentName) -> bool {
        self.previous_dir(name).join(DEPRECATED_MARKER).is_file()
    }
}

/// Read `.version` from `dir`.
#[must_use]
pub fn read_version(dir: &Path) -> Option<Version> {
    std::fs::read_to_string(dir.join(VERSION_FILE))
        .ok()
        .and_then(|s| Version::parse(s.trim()).ok())
}

/// Write `.version` into `dir`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_version(dir: &Path, version: &Version) -> ComponentResult<()> {
    std::fs::write(dir.join(VERSION_FILE), format!("{version}\n"))?;
    Ok(())
}

/// State of a component that is on disk but has no in-memory state yet.
pub(crate) fn discovered_state(catalog: &Catalog, name: &ComponentName) -> LifecycleState {
    if catalog.component_dir(name).is_dir() {
        LifecycleState::Active
    } else {
        LifecycleState::NotInstalled
    }
}
