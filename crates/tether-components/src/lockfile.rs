//! Component lock file.
//!
//! `components/components.lock` records every released component that was
//! installed through the lifecycle manager: its version, the blake3 digest
//! of the executable, and whether it is deprecated. The catalog compares
//! the disk against it to detect tampering.
//!
//! # Format
//!
//! TOML with `schema_version = 1` and a flat `[[component]]` array of
//! [`LockedComponent`] entries.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::{Deserialize, Serialize};
use tether_core::ComponentName;
use tracing::{debug, warn};

use crate::error::{ComponentError, ComponentResult};

/// Current lock file schema version.
const SCHEMA_VERSION: u32 = 1;

/// Standard lock file name.
pub const LOCKFILE_NAME: &str = "components.lock";

/// Installed components and their digests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentLockfile {
    schema_version: u32,
    #[serde(default, rename = "component")]
    entries: Vec<LockedComponent>,
}

/// One installed component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedComponent {
    /// Component name.
    pub name: ComponentName,
    /// Installed version.
    pub version: Version,
    /// `blake3:<hex>` digest of the executable.
    pub digest: String,
    /// Whether the installed version is deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// When this version was placed.
    pub installed_at: DateTime<Utc>,
}

impl LockedComponent {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(name: ComponentName, version: Version, digest: String) -> Self {
        Self {
            name,
            version,
            digest,
            deprecated: false,
            installed_at: Utc::now(),
        }
    }

    /// Mark the entry deprecated.
    #[must_use]
    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }
}

/// Digest of a file in lock file format (`blake3:<hex>`).
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_digest(path: &Path) -> ComponentResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("blake3:{}", blake3::hash(&bytes).to_hex()))
}

impl ComponentLockfile {
    /// Create an empty lock file.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: Vec::new(),
        }
    }

    /// Load from disk, returning an empty lock file if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> ComponentResult<Self> {
        let _lock_guard = acquire_lock_file(path, LockMode::Shared)?;

        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse_content(path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(lock_error(path, format!("failed to read lockfile: {e}"))),
        }
    }

    fn parse_content(path: &Path, content: &str) -> ComponentResult<Self> {
        let lockfile: Self = toml::from_str(content)
            .map_err(|e| lock_error(path, format!("failed to parse lockfile: {e}")))?;

        if lockfile.schema_version != SCHEMA_VERSION {
            warn!(
                path = %path.display(),
                found = lockfile.schema_version,
                expected = SCHEMA_VERSION,
                "Lockfile schema version mismatch, attempting best-effort load"
            );
        }

        debug!(
            path = %path.display(),
            entries = lockfile.entries.len(),
            "Loaded component lockfile"
        );
        Ok(lockfile)
    }

    /// Load, mutate and save under a single exclusive lock.
    ///
    /// A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written, or
    /// if `f` fails.
    pub fn update<F>(path: &Path, f: F) -> ComponentResult<()>
    where
        F: FnOnce(&mut Self) -> ComponentResult<()>,
    {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| lock_error(path, format!("failed to create parent directory: {e}")))?;
        }

        let _lock_guard = acquire_lock_file(path, LockMode::Exclusive)?;

        let mut lockfile = match std::fs::read_to_string(path) {
            Ok(content) => Self::parse_content(path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::new(),
            Err(e) => return Err(lock_error(path, format!("failed to read lockfile: {e}"))),
        };

        f(&mut lockfile)?;
        lockfile.save_inner(path)
    }

    /// Write via a temp file in the same directory, then rename into place.
    /// Caller holds the exclusive lock.
    fn save_inner(&self, path: &Path) -> ComponentResult<()> {
        let header = "# Auto-generated by tether. Do not edit manually.\n\n";
        let body = toml::to_string_pretty(self)
            .map_err(|e| lock_error(path, format!("failed to serialize lockfile: {e}")))?;
        let content = format!("{header}{body}");

        let parent = path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| lock_error(path, format!("failed to create temp file: {e}")))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| lock_error(path, format!("failed to write temp lockfile: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| lock_error(path, format!("failed to sync temp lockfile: {e}")))?;
        tmp.persist(path)
            .map_err(|e| lock_error(path, format!("failed to replace lockfile: {e}")))?;

        debug!(path = %path.display(), entries = self.entries.len(), "Saved component lockfile");
        Ok(())
    }

    /// Add or replace the entry for `entry.name`.
    pub fn add(&mut self, entry: LockedComponent) {
        self.remove(&entry.name);
        self.entries.push(entry);
        self.entries.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Remove an entry. Returns `true` if one was removed.
    pub fn remove(&mut self, name: &ComponentName) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != *name);
        self.entries.len() < before
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, name: &ComponentName) -> Option<&LockedComponent> {
        self.entries.iter().find(|e| e.name == *name)
    }

    /// All entries, sorted by name.
    #[must_use]
    pub fn entries(&self) -> &[LockedComponent] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ComponentLockfile {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(path: &Path, message: String) -> ComponentError {
    ComponentError::LockfileError {
        path: path.to_path_buf(),
        message,
    }
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Advisory lock on a `.lk` sibling of `lockfile_path`, released on drop.
///
/// Shared mode never creates the lock file: if it is absent there is no
/// writer to coordinate with.
fn acquire_lock_file(
    lockfile_path: &Path,
    mode: LockMode,
) -> ComponentResult<Option<std::fs::File>> {
    let lock_path = lockfile_path.with_extension("lk");

    match mode {
        LockMode::Shared => match std::fs::OpenOptions::new().read(true).open(&lock_path) {
            Ok(lock_file) => {
                lock_file.lock_shared().map_err(|e| {
                    lock_error(lockfile_path, format!("failed to acquire shared lock: {e}"))
                })?;
                Ok(Some(lock_file))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(lock_error(
                lockfile_path,
                format!("failed to open lock file: {e}"),
            )),
        },
        LockMode::Exclusive => {
            let lock_file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .read(true)
                .open(&lock_path)
                .map_err(|e| lock_error(lockfile_path, format!("failed to open lock file: {e}")))?;
            lock_file.lock_exclusive().map_err(|e| {
                lock_error(lockfile_path, format!("failed to acquire exclusive lock: {e}"))
            })?;
            Ok(Some(lock_file))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(s: &str) -> ComponentName {
        ComponentName::new(s).unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let lock = ComponentLockfile::load_or_default(&dir.path().join(LOCKFILE_NAME)).unwrap();
        assert!(lock.is_empty());
    }

    #[test]
    fn update_adds_and_removes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCKFILE_NAME);

        ComponentLockfile::update(&path, |lock| {
            lock.add(LockedComponent::new(name("vuln"), Version::new(1, 0, 0), "blake3:aa".into()));
            lock.add(
                LockedComponent::new(name("iac"), Version::new(2, 0, 0), "blake3:bb".into())
                    .with_deprecated(true),
            );
            Ok(())
        })
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Auto-generated by tether"));
        assert!(content.contains("[[component]]"));

        let lock = ComponentLockfile::load_or_default(&path).unwrap();
        assert_eq!(lock.len(), 2);
        assert_eq!(lock.entries()[0].name.as_str(), "iac");
        assert!(lock.get(&name("iac")).unwrap().deprecated);

        ComponentLockfile::update(&path, |lock| {
            assert!(lock.remove(&name("iac")));
            assert!(!lock.remove(&name("iac")));
            Ok(())
        })
        .unwrap();
        let lock = ComponentLockfile::load_or_default(&path).unwrap();
        assert_eq!(lock.len(), 1);
        assert!(lock.get(&name("iac")).is_none());
    }

    #[test]
    fn add_replaces_existing_entry() {
        let mut lock = ComponentLockfile::new();
        lock.add(LockedComponent::new(name("iac"), Version::new(1, 0, 0), "blake3:aa".into()));
        lock.add(LockedComponent::new(name("iac"), Version::new(1, 1, 0), "blake3:bb".into()));
        assert_eq!(lock.len(), 1);
        assert_eq!(lock.get(&name("iac")).unwrap().version, Version::new(1, 1, 0));
    }

    #[test]
    fn failed_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCKFILE_NAME);
        ComponentLockfile::update(&path, |lock| {
            lock.add(LockedComponent::new(name("iac"), Version::new(1, 0, 0), "blake3:aa".into()));
            Ok(())
        })
        .unwrap();

        let result = ComponentLockfile::update(&path, |lock| {
            lock.remove(&name("iac"));
            Err(ComponentError::NotFound("iac".into()))
        });
        assert!(result.is_err());
        assert_eq!(ComponentLockfile::load_or_default(&path).unwrap().len(), 1);
    }

    #[test]
    fn crafted_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LOCKFILE_NAME);
        std::fs::write(
            &path,
            "schema_version = 1\n\n[[component]]\nname = \"../etc\"\nversion = \"1.0.0\"\ndigest = \"blake3:aa\"\ninstalled_at = \"2026-01-01T00:00:00Z\"\n",
        )
        .unwrap();
        let err = ComponentLockfile::load_or_default(&path).unwrap_err();
        assert!(matches!(err, ComponentError::LockfileError { .. }));
    }

    #[test]
    fn digest_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, b"hello").unwrap();
        let digest = compute_digest(&path).unwrap();
        assert_eq!(digest, format!("blake3:{}", blake3::hash(b"hello").to_hex()));
    }
}
