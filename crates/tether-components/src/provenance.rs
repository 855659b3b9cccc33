//! Where an installed component came from.

use std::fmt;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, ComponentResult};

/// Version reported by every development build.
pub const DEV_VERSION: &str = "0.0.0-dev";

/// Marker file written into a development component's directory.
pub const DEV_MARKER: &str = ".dev";

/// Metadata stored in the `.dev` marker of a development component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevInfo {
    /// Always [`DEV_VERSION`] when written by this crate.
    pub version: String,
    /// Free-form description shown in listings.
    #[serde(default)]
    pub description: String,
}

impl DevInfo {
    /// Create dev metadata with the standard dev version.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            version: DEV_VERSION.to_string(),
            description: description.into(),
        }
    }

    /// Parsed version, falling back to [`DEV_VERSION`] if the marker holds
    /// something unparseable.
    #[must_use]
    pub fn semver(&self) -> Version {
        Version::parse(&self.version).unwrap_or_else(|_| dev_version())
    }

    /// Read the marker from `dir`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> ComponentResult<Option<Self>> {
        let path = dir.join(DEV_MARKER);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                ComponentError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid dev marker {}: {e}", path.display()),
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the marker into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn save(&self, dir: &Path) -> ComponentResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComponentError::Io(std::io::Error::other(e.to_string())))?;
        std::fs::write(dir.join(DEV_MARKER), json)?;
        Ok(())
    }
}

pub(crate) fn dev_version() -> Version {
    Version {
        pre: semver::Prerelease::new("dev").unwrap_or_default(),
        ..Version::new(0, 0, 0)
    }
}

/// Provenance of a component.
///
/// The set is closed. Code that needs to treat kinds differently matches
/// on it; everything else goes through
/// [`ComponentCapabilities`](crate::ComponentCapabilities).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// A normally released version.
    Released,
    /// A released version that has since been deprecated.
    Deprecated,
    /// A local development build.
    Dev(DevInfo),
}

impl Provenance {
    /// Short label for listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Deprecated => "deprecated",
            Self::Dev(_) => "development",
        }
    }

    /// Whether this is a development build.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev(_))
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_info_round_trips_through_marker() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DevInfo::load(dir.path()).unwrap().is_none());

        DevInfo::new("local hacking").save(dir.path()).unwrap();
        let info = DevInfo::load(dir.path()).unwrap().unwrap();
        assert_eq!(info.version, DEV_VERSION);
        assert_eq!(info.description, "local hacking");
        assert_eq!(info.semver(), dev_version());
    }

    #[test]
    fn corrupt_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEV_MARKER), "not json").unwrap();
        assert!(DevInfo::load(dir.path()).is_err());
    }

    #[test]
    fn dev_version_matches_constant() {
        assert_eq!(dev_version().to_string(), DEV_VERSION);
    }

    #[test]
    fn labels() {
        assert_eq!(Provenance::Released.label(), "released");
        assert_eq!(Provenance::Deprecated.to_string(), "deprecated");
        assert!(Provenance::Dev(DevInfo::new("")).is_dev());
    }
}
