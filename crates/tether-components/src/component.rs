//! Component type, lifecycle states and the shared capability trait.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;
use tether_core::ComponentName;

use crate::error::{ComponentError, ComponentResult};
use crate::provenance::Provenance;

/// Lifecycle state of a component on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing on disk.
    NotInstalled,
    /// Placed on disk, Init hook not yet confirmed.
    Installed,
    /// Installed and initialized.
    Active,
    /// A version change is in flight.
    Reconfiguring,
    /// Cleanup hook running ahead of removal.
    CleaningUp,
}

impl LifecycleState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Installed -> NotInstalled` is only used to undo a placement whose
    /// Init hook failed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotInstalled, Self::Installed)
                | (Self::Installed, Self::Active | Self::NotInstalled)
                | (Self::Active, Self::Reconfiguring | Self::CleaningUp)
                | (Self::Reconfiguring, Self::Active)
                | (Self::CleaningUp, Self::NotInstalled)
        )
    }

    /// Validate a move from `self` to `next` for component `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidTransition`] for any edge not in
    /// the lifecycle.
    pub fn transition(self, next: Self, name: &ComponentName) -> ComponentResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ComponentError::InvalidTransition {
                name: name.to_string(),
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotInstalled => "not-installed",
            Self::Installed => "installed",
            Self::Active => "active",
            Self::Reconfiguring => "reconfiguring",
            Self::CleaningUp => "cleaning-up",
        })
    }
}

/// Health of an installed component as seen by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    /// Released build matching its lock entry.
    Installed,
    /// Deprecated build matching its lock entry.
    Deprecated,
    /// Development build.
    Development,
    /// On-disk state disagrees with what was recorded at install time.
    Tainted {
        /// What is wrong.
        reason: String,
    },
}

impl ComponentStatus {
    /// Whether the component should be trusted to run.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        matches!(self, Self::Tainted { .. })
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => f.write_str("Installed"),
            Self::Deprecated => f.write_str("Deprecated"),
            Self::Development => f.write_str("Development"),
            Self::Tainted { .. } => f.write_str("Tainted"),
        }
    }
}

/// The capabilities every component offers regardless of provenance.
///
/// Lifecycle code only talks to components through this trait.
pub trait ComponentCapabilities: Send + Sync {
    /// Component name.
    fn name(&self) -> &ComponentName;
    /// Declared version.
    fn version(&self) -> &Version;
    /// Path of the executable.
    fn executable(&self) -> &Path;
    /// One-line description for listings and logs.
    fn summary(&self) -> String;
}

/// A component known to the host.
#[derive(Debug, Clone)]
pub struct Component {
    name: ComponentName,
    version: Version,
    provenance: Provenance,
    directory: PathBuf,
    executable: PathBuf,
    size: u64,
    state: LifecycleState,
    status: ComponentStatus,
}

impl Component {
    /// Describe a component whose executable lives at
    /// `directory/<name>`. State starts as `Active` and status is derived
    /// from provenance.
    #[must_use]
    pub fn new(
        name: ComponentName,
        version: Version,
        provenance: Provenance,
        directory: impl Into<PathBuf>,
    ) -> Self {
        let directory = directory.into();
        let executable = directory.join(name.as_str());
        let size = std::fs::metadata(&executable).map_or(0, |m| m.len());
        let status = match &provenance {
            Provenance::Released => ComponentStatus::Installed,
            Provenance::Deprecated => ComponentStatus::Deprecated,
            Provenance::Dev(_) => ComponentStatus::Development,
        };
        Self {
            name,
            version,
            provenance,
            directory,
            executable,
            size,
            state: LifecycleState::Active,
            status,
        }
    }

    /// Override the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    /// Mark the component as tainted.
    #[must_use]
    pub fn tainted(mut self, reason: impl Into<String>) -> Self {
        self.status = ComponentStatus::Tainted {
            reason: reason.into(),
        };
        self
    }

    /// Provenance.
    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Directory holding the executable and its metadata.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Executable size in bytes (0 if missing).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Catalog status.
    #[must_use]
    pub fn status(&self) -> &ComponentStatus {
        &self.status
    }

    /// Build a command that executes the component.
    ///
    /// Stdio and environment are left to the caller.
    #[must_use]
    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.executable);
        cmd.current_dir(&self.directory);
        cmd
    }
}

impl ComponentCapabilities for Component {
    fn name(&self) -> &ComponentName {
        &self.name
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn executable(&self) -> &Path {
        &self.executable
    }

    fn summary(&self) -> String {
        match &self.provenance {
            Provenance::Released => format!("{} {}", self.name, self.version),
            Provenance::Deprecated => format!("{} {} (deprecated)", self.name, self.version),
            Provenance::Dev(info) if info.description.is_empty() => {
                format!("{} {} (development)", self.name, self.version)
            },
            Provenance::Dev(info) => format!(
                "{} {} (development: {})",
                self.name, self.version, info.description
            ),
        }
    }
}
