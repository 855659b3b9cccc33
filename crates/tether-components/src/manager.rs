//! Component lifecycle manager.
//!
//! Drives install, version changes and removal through the lifecycle
//! state machine, running the component's hooks at each step:
//!
//! - **install**: stage, place, Init. An Init failure removes the placement.
//! - **update / rollback**: stage, Reconfigure on the incoming executable,
//!   then swap. A Reconfigure failure discards the staging and keeps the
//!   active version.
//! - **uninstall**: Cleanup, then remove. A Cleanup failure is logged only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use semver::Version;
use tether_core::ComponentName;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, DEPRECATED_MARKER, VERSION_FILE, discovered_state, write_version};
use crate::component::{Component, ComponentCapabilities, LifecycleState};
use crate::error::{ComponentError, ComponentResult};
use crate::hooks::{Hook, HookRunner};
use crate::lockfile::{ComponentLockfile, LockedComponent, compute_digest};
use crate::provenance::{DEV_MARKER, DevInfo, Provenance};

/// Where the outgoing version is assembled before it replaces `.previous/`.
const INCOMING_PREVIOUS_DIR: &str = ".previous.incoming";

/// An executable offered for installation.
#[derive(Debug, Clone)]
pub struct Artifact {
    path: PathBuf,
    version: Version,
    digest: Option<String>,
    deprecated: bool,
}

impl Artifact {
    /// Artifact at `path` declaring `version`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            path: path.into(),
            version,
            digest: None,
            deprecated: false,
        }
    }

    /// Artifact with a version given as text.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidVersion`] if `version` is not semver.
    pub fn parse(path: impl Into<PathBuf>, version: &str) -> ComponentResult<Self> {
        let parsed = Version::parse(version.trim()).map_err(|e| ComponentError::InvalidVersion {
            version: version.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(path, parsed))
    }

    /// Require the file to match a `blake3:<hex>` digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Mark the version as deprecated.
    #[must_use]
    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Source path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    fn provenance(&self) -> Provenance {
        if self.deprecated {
            Provenance::Deprecated
        } else {
            Provenance::Released
        }
    }

    /// Hash the file and compare against the expected digest, if any.
    fn verify(&self) -> ComponentResult<String> {
        let actual = compute_digest(&self.path)?;
        match &self.digest {
            Some(expected) if *expected != actual => Err(ComponentError::DigestMismatch {
                expected: expected.clone(),
                actual,
            }),
            _ => Ok(actual),
        }
    }
}

/// Coordinates component lifecycles on one host.
///
/// Operations take `&mut self` and run one at a time.
#[derive(Debug)]
pub struct LifecycleManager {
    catalog: Catalog,
    hooks: HookRunner,
    states: HashMap<ComponentName, LifecycleState>,
}

impl LifecycleManager {
    /// Manager over `catalog`, running hooks with `hooks`.
    #[must_use]
    pub fn new(catalog: Catalog, hooks: HookRunner) -> Self {
        Self {
            catalog,
            hooks,
            states: HashMap::new(),
        }
    }

    /// The underlying catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current lifecycle state of `name`.
    #[must_use]
    pub fn state(&self, name: &ComponentName) -> LifecycleState {
        self.states
            .get(name)
            .copied()
            .unwrap_or_else(|| discovered_state(&self.catalog, name))
    }

    /// All components on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the components directory or lock file cannot be
    /// read.
    pub fn list(&self) -> ComponentResult<Vec<Component>> {
        Ok(self
            .catalog
            .discover()?
            .into_iter()
            .map(|c| {
                let state = self.state(c.name());
                c.with_state(state)
            })
            .collect())
    }

    /// One component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if it is not installed.
    pub fn get(&self, name: &ComponentName) -> ComponentResult<Component> {
        let component = self.catalog.get(name)?;
        Ok(component.with_state(self.state(name)))
    }

    // -----------------------------------------------------------------------
    // Install
    // -----------------------------------------------------------------------

    /// Place `artifact` as component `name` and run its Init hook.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::AlreadyInstalled`] if the name is taken.
    /// - [`ComponentError::DigestMismatch`] if the artifact fails
    ///   verification.
    /// - [`ComponentError::HookFailure`] if Init fails. Nothing is left on
    ///   disk or in the lock file.
    pub async fn install(
        &mut self,
        name: &ComponentName,
        artifact: &Artifact,
    ) -> ComponentResult<Component> {
        let dir = self.catalog.component_dir(name);
        if dir.exists() {
            return Err(ComponentError::AlreadyInstalled(name.to_string()));
        }
        let digest = artifact.verify()?;
        let (staging, staged) = self.stage(name, artifact)?;

        self.set_state(name, LifecycleState::Installed)?;
        let placed = std::fs::rename(&staged, &dir);
        drop(staging);
        if let Err(e) = placed {
            self.set_state(name, LifecycleState::NotInstalled)?;
            return Err(e.into());
        }

        let component = Component::new(
            name.clone(),
            artifact.version().clone(),
            artifact.provenance(),
            &dir,
        )
        .with_state(LifecycleState::Installed);
        info!(component = %component.summary(), "Initializing component");

        let recorded = match self.hooks.run(&component, &Hook::Init).await {
            Ok(()) => self.record(name, artifact, digest),
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            remove_placement(&dir);
            self.set_state(name, LifecycleState::NotInstalled)?;
            return Err(e);
        }

        self.set_state(name, LifecycleState::Active)?;
        info!(component = %name, version = %artifact.version(), "Component installed");
        self.get(name)
    }

    // -----------------------------------------------------------------------
    // Reconfigure
    // -----------------------------------------------------------------------

    /// Move `name` to a newer version.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::HookFailure`] if Reconfigure fails; the
    /// active version is left in place.
    pub async fn update(
        &mut self,
        name: &ComponentName,
        artifact: &Artifact,
    ) -> ComponentResult<Component> {
        self.reconfigure(name, artifact, "update").await
    }

    /// Move `name` to an older version supplied by the caller.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn rollback_to(
        &mut self,
        name: &ComponentName,
        artifact: &Artifact,
    ) -> ComponentResult<Component> {
        self.reconfigure(name, artifact, "rollback").await
    }

    /// Restore the version kept in `.previous/`, with the deprecation it
    /// had when it was active.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NoPreviousVersion`] if nothing is kept.
    pub async fn rollback(&mut self, name: &ComponentName) -> ComponentResult<Component> {
        self.catalog.get(name)?;
        let (executable, version) = self
            .catalog
            .previous(name)
            .ok_or_else(|| ComponentError::NoPreviousVersion(name.to_string()))?;
        let artifact = Artifact::new(executable, version)
            .with_deprecated(self.catalog.previous_deprecated(name));
        self.reconfigure(name, &artifact, "rollback").await
    }

    async fn reconfigure(
        &mut self,
        name: &ComponentName,
        artifact: &Artifact,
        action: &'static str,
    ) -> ComponentResult<Component> {
        let current = self.catalog.get(name)?;
        let digest = artifact.verify()?;
        let (staging, staged) = self.stage(name, artifact)?;

        self.set_state(name, LifecycleState::Reconfiguring)?;
        let incoming = Component::new(
            name.clone(),
            artifact.version().clone(),
            artifact.provenance(),
            &staged,
        )
        .with_state(LifecycleState::Reconfiguring);
        let hook = Hook::Reconfigure {
            from: current.version().clone(),
            to: artifact.version().clone(),
        };
        info!(
            component = %name,
            action,
            from = %current.version(),
            to = %artifact.version(),
            "Reconfiguring component"
        );

        let outcome = match self.hooks.run_in(&incoming, &hook, current.directory()).await {
            Ok(()) => self.swap_in(&current, &staged, artifact, digest),
            Err(e) => Err(e),
        };
        drop(staging);
        self.set_state(name, LifecycleState::Active)?;
        outcome?;

        info!(component = %name, version = %artifact.version(), action, "Component reconfigured");
        self.get(name)
    }

    /// Move the active version into `.previous/` and the staged one into
    /// its place.
    ///
    /// The outgoing version is kept in a side directory until the lock file
    /// is updated. A failure before that puts the active version back.
    fn swap_in(
        &self,
        current: &Component,
        staged: &Path,
        artifact: &Artifact,
        digest: String,
    ) -> ComponentResult<()> {
        let name = current.name();
        let kept = current.directory().join(INCOMING_PREVIOUS_DIR);

        if let Err(e) = prepare_kept(current, &kept) {
            remove_placement(&kept);
            return Err(e);
        }
        let dev_marker = std::fs::read(current.directory().join(DEV_MARKER)).ok();

        if let Err(e) = self.move_into_place(current, staged, &kept, artifact, digest) {
            warn!(component = %name, error = %e, "Version swap failed, restoring active version");
            restore_active(current, &kept, dev_marker.as_deref());
            return Err(e);
        }

        let previous = self.catalog.previous_dir(name);
        let replaced = remove_dir_if_present(&previous)
            .and_then(|()| std::fs::rename(&kept, &previous).map_err(ComponentError::from));
        if let Err(e) = replaced {
            warn!(component = %name, error = %e, "Failed to keep previous version for rollback");
        }
        Ok(())
    }

    fn move_into_place(
        &self,
        current: &Component,
        staged: &Path,
        kept: &Path,
        artifact: &Artifact,
        digest: String,
    ) -> ComponentResult<()> {
        let name = current.name();
        let dir = current.directory();

        if current.executable().is_file() {
            std::fs::rename(current.executable(), kept.join(name.as_str()))?;
        }
        std::fs::rename(staged.join(name.as_str()), current.executable())?;
        std::fs::rename(staged.join(VERSION_FILE), dir.join(VERSION_FILE))?;
        match std::fs::remove_file(dir.join(DEV_MARKER)) {
            Ok(()) => debug!(component = %name, "Cleared development marker"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(e.into()),
        }

        self.record(name, artifact, digest)
    }

    // -----------------------------------------------------------------------
    // Uninstall
    // -----------------------------------------------------------------------

    /// Run Cleanup and remove `name`.
    ///
    /// A failing Cleanup hook does not stop the removal.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NotFound`] if it is not installed, or an
    /// I/O error if the files cannot be removed.
    pub async fn uninstall(&mut self, name: &ComponentName) -> ComponentResult<()> {
        let component = self.get(name)?;
        self.set_state(name, LifecycleState::CleaningUp)?;

        let component = component.with_state(LifecycleState::CleaningUp);
        if let Err(e) = self.hooks.run(&component, &Hook::Cleanup).await {
            warn!(component = %name, error = %e, "Cleanup hook failed, removing anyway");
        }

        if let Err(e) = std::fs::remove_dir_all(component.directory()) {
            self.states.remove(name);
            return Err(e.into());
        }
        self.set_state(name, LifecycleState::NotInstalled)?;

        ComponentLockfile::update(&self.catalog.lockfile_path(), |lock| {
            lock.remove(name);
            Ok(())
        })?;
        info!(component = %name, "Component uninstalled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Development
    // -----------------------------------------------------------------------

    /// Create `name` as a development component, or mark an existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or marker cannot be written.
    pub fn develop(&mut self, name: &ComponentName, description: &str) -> ComponentResult<Component> {
        let created = self.state(name) == LifecycleState::NotInstalled;
        if created {
            self.set_state(name, LifecycleState::Installed)?;
        }

        let dir = self.catalog.component_dir(name);
        let written = std::fs::create_dir_all(&dir)
            .map_err(ComponentError::from)
            .and_then(|()| DevInfo::new(description).save(&dir));
        if let Err(e) = written {
            if created {
                remove_placement(&dir);
                self.set_state(name, LifecycleState::NotInstalled)?;
            }
            return Err(e);
        }

        if created {
            self.set_state(name, LifecycleState::Active)?;
        }
        info!(component = %name, directory = %dir.display(), "Development component ready");
        self.get(name)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_state(&mut self, name: &ComponentName, next: LifecycleState) -> ComponentResult<()> {
        let next = self.state(name).transition(next, name)?;
        debug!(component = %name, state = %next, "Lifecycle state changed");
        self.states.insert(name.clone(), next);
        Ok(())
    }

    /// Copy the artifact into a fresh staging directory inside the
    /// components root. The returned guard removes it on drop.
    fn stage(
        &self,
        name: &ComponentName,
        artifact: &Artifact,
    ) -> ComponentResult<(tempfile::TempDir, PathBuf)> {
        std::fs::create_dir_all(self.catalog.root())?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(self.catalog.root())?;
        let staged = staging.path().join(name.as_str());
        std::fs::create_dir(&staged)?;

        let executable = staged.join(name.as_str());
        std::fs::copy(artifact.path(), &executable)?;
        make_executable(&executable)?;
        write_version(&staged, artifact.version())?;
        Ok((staging, staged))
    }

    fn record(&self, name: &ComponentName, artifact: &Artifact, digest: String) -> ComponentResult<()> {
        ComponentLockfile::update(&self.catalog.lockfile_path(), |lock| {
            lock.add(
                LockedComponent::new(name.clone(), artifact.version().clone(), digest)
                    .with_deprecated(artifact.deprecated),
            );
            Ok(())
        })
    }
}

fn remove_placement(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {},
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!(directory = %dir.display(), error = %e, "Failed to remove placement"),
    }
}

fn remove_dir_if_present(dir: &Path) -> ComponentResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Fresh side directory describing the outgoing version.
fn prepare_kept(current: &Component, kept: &Path) -> ComponentResult<()> {
    remove_dir_if_present(kept)?;
    std::fs::create_dir(kept)?;
    write_version(kept, current.version())?;
    if matches!(current.provenance(), Provenance::Deprecated) {
        std::fs::write(kept.join(DEPRECATED_MARKER), b"")?;
    }
    Ok(())
}

/// Undo a partial swap: the kept executable, `.version` and dev marker go
/// back into the live directory.
fn restore_active(current: &Component, kept: &Path, dev_marker: Option<&[u8]>) {
    let name = current.name();
    let dir = current.directory();

    let kept_executable = kept.join(name.as_str());
    let restored = if kept_executable.is_file() {
        std::fs::rename(&kept_executable, current.executable())
    } else {
        Ok(())
    };
    if let Err(e) = restored {
        warn!(component = %name, error = %e, "Failed to restore executable");
    }
    if let Err(e) = write_version(dir, current.version()) {
        warn!(component = %name, error = %e, "Failed to restore version file");
    }
    if let Some(Err(e)) = dev_marker.map(|bytes| std::fs::write(dir.join(DEV_MARKER), bytes)) {
        warn!(component = %name, error = %e, "Failed to restore development marker");
    }
    remove_placement(kept);
}

#[cfg(unix)]
fn make_executable(path: &Path) -> ComponentResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> ComponentResult<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::component::ComponentStatus;
    use crate::hooks::test_support::write_script;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        manager: LifecycleManager,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir_all(dir.path().join("artifacts")).unwrap();
            let catalog = Catalog::new(dir.path().join("components"));
            Self {
                manager: LifecycleManager::new(catalog, HookRunner::new()),
                dir,
            }
        }

        fn log(&self) -> PathBuf {
            self.dir.path().join("hooks.log")
        }

        fn log_lines(&self) -> Vec<String> {
            std::fs::read_to_string(self.log())
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        /// Script that logs its arguments, runs `extra`, then exits 0.
        fn artifact(&self, file: &str, version: &str, extra: &str) -> Artifact {
            let path = self.dir.path().join("artifacts").join(file);
            write_script(
                &path,
                &format!("# {file}\necho \"$@\" >> \"{}\"\n{extra}\nexit 0", self.log().display()),
            );
            Artifact::parse(path, version).unwrap()
        }

        fn lock(&self) -> ComponentLockfile {
            self.manager.catalog().lockfile().unwrap()
        }

        fn staging_dirs(&self) -> usize {
            std::fs::read_dir(self.manager.catalog().root())
                .map(|entries| {
                    entries
                        .filter_map(Result::ok)
                        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging-"))
                        .count()
                })
                .unwrap_or(0)
        }
    }

    fn name(s: &str) -> ComponentName {
        ComponentName::new(s).unwrap()
    }

    #[tokio::test]
    async fn install_runs_init_and_records_lock() {
        let mut f = Fixture::new();
        let artifact = f.artifact("iac-1", "1.0.0", "");

        let c = f.manager.install(&name("iac"), &artifact).await.unwrap();
        assert_eq!(c.version(), &Version::new(1, 0, 0));
        assert_eq!(c.state(), LifecycleState::Active);
        assert_eq!(c.status(), &ComponentStatus::Installed);
        assert_eq!(f.log_lines(), vec!["tether-init"]);

        let lock = f.lock();
        let entry = lock.get(&name("iac")).unwrap();
        assert_eq!(entry.version, Version::new(1, 0, 0));
        assert_eq!(entry.digest, compute_digest(artifact.path()).unwrap());
        assert_eq!(f.staging_dirs(), 0);
    }

    #[tokio::test]
    async fn init_failure_rolls_back_placement() {
        let mut f = Fixture::new();
        let artifact = f.artifact(
            "iac-1",
            "1.0.0",
            "if [ \"$1\" = tether-init ]; then echo 'bad credentials' >&2; exit 2; fi",
        );

        let err = f.manager.install(&name("iac"), &artifact).await.unwrap_err();
        match err {
            ComponentError::HookFailure {
                hook,
                exit_code,
                message,
            } => {
                assert_eq!(hook, "tether-init");
                assert_eq!(exit_code, Some(2));
                assert_eq!(message, "bad credentials");
            },
            other => panic!("unexpected error: {other}"),
        }

        assert!(!f.manager.catalog().component_dir(&name("iac")).exists());
        assert!(f.lock().get(&name("iac")).is_none());
        assert_eq!(f.manager.state(&name("iac")), LifecycleState::NotInstalled);
        assert!(f.manager.list().unwrap().is_empty());
        assert_eq!(f.staging_dirs(), 0);
    }

    #[tokio::test]
    async fn install_twice_is_rejected() {
        let mut f = Fixture::new();
        let artifact = f.artifact("iac-1", "1.0.0", "");
        f.manager.install(&name("iac"), &artifact).await.unwrap();

        let err = f.manager.install(&name("iac"), &artifact).await.unwrap_err();
        assert!(matches!(err, ComponentError::AlreadyInstalled(_)));
        assert_eq!(f.log_lines().len(), 1);
    }

    #[tokio::test]
    async fn digest_mismatch_places_nothing() {
        let mut f = Fixture::new();
        let artifact = f.artifact("iac-1", "1.0.0", "").with_digest("blake3:00");

        let err = f.manager.install(&name("iac"), &artifact).await.unwrap_err();
        assert!(matches!(err, ComponentError::DigestMismatch { .. }));
        assert!(!f.manager.catalog().component_dir(&name("iac")).exists());
        assert!(f.log_lines().is_empty());
    }

    #[tokio::test]
    async fn reconfigure_receives_versions_verbatim() {
        let mut f = Fixture::new();
        let v2 = f.artifact("iac-2", "2.0.0", "");
        let v15 = f.artifact("iac-15", "1.5.0", "");
        f.manager.install(&name("iac"), &v2).await.unwrap();

        let c = f.manager.rollback_to(&name("iac"), &v15).await.unwrap();
        assert_eq!(c.version(), &Version::new(1, 5, 0));
        assert_eq!(c.state(), LifecycleState::Active);
        assert!(!c.status().is_tainted());
        assert_eq!(
            f.log_lines(),
            vec!["tether-init", "tether-reconfigure 2.0.0 1.5.0"]
        );

        let (_, previous) = f.manager.catalog().previous(&name("iac")).unwrap();
        assert_eq!(previous, Version::new(2, 0, 0));
        assert_eq!(
            f.lock().get(&name("iac")).unwrap().version,
            Version::new(1, 5, 0)
        );
    }

    #[tokio::test]
    async fn failed_reconfigure_keeps_active_version() {
        let mut f = Fixture::new();
        let v1 = f.artifact("iac-1", "1.0.0", "");
        let v2 = f.artifact(
            "iac-2",
            "2.0.0",
            "if [ \"$1\" = tether-reconfigure ]; then echo 'migration failed' >&2; exit 1; fi",
        );
        f.manager.install(&name("iac"), &v1).await.unwrap();

        let err = f.manager.update(&name("iac"), &v2).await.unwrap_err();
        assert!(err.is_hook_failure());

        let c = f.manager.get(&name("iac")).unwrap();
        assert_eq!(c.version(), &Version::new(1, 0, 0));
        assert_eq!(c.state(), LifecycleState::Active);
        assert!(!c.status().is_tainted());
        assert!(f.manager.catalog().previous(&name("iac")).is_none());
        assert_eq!(f.staging_dirs(), 0);
    }

    #[tokio::test]
    async fn rollback_restores_previous() {
        let mut f = Fixture::new();
        let v1 = f.artifact("iac-1", "1.0.0", "");
        let v2 = f.artifact("iac-2", "2.0.0", "");
        f.manager.install(&name("iac"), &v1).await.unwrap();
        f.manager.update(&name("iac"), &v2).await.unwrap();

        let c = f.manager.rollback(&name("iac")).await.unwrap();
        assert_eq!(c.version(), &Version::new(1, 0, 0));
        assert!(!c.status().is_tainted());
        assert_eq!(
            f.log_lines().last().map(String::as_str),
            Some("tether-reconfigure 2.0.0 1.0.0")
        );
        let (_, previous) = f.manager.catalog().previous(&name("iac")).unwrap();
        assert_eq!(previous, Version::new(2, 0, 0));
    }

    #[tokio::test]
    async fn rollback_without_previous_fails() {
        let mut f = Fixture::new();
        let v1 = f.artifact("iac-1", "1.0.0", "");
        f.manager.install(&name("iac"), &v1).await.unwrap();

        let err = f.manager.rollback(&name("iac")).await.unwrap_err();
        assert!(matches!(err, ComponentError::NoPreviousVersion(_)));

        let err = f.manager.rollback(&name("other")).await.unwrap_err();
        assert!(matches!(err, ComponentError::NotFound(_)));
    }

    #[tokio::test]
    async fn cleanup_failure_still_uninstalls() {
        let mut f = Fixture::new();
        let artifact = f.artifact(
            "iac-1",
            "1.0.0",
            "if [ \"$1\" = tether-cleanup ]; then echo 'cannot revoke' >&2; exit 7; fi",
        );
        f.manager.install(&name("iac"), &artifact).await.unwrap();

        f.manager.uninstall(&name("iac")).await.unwrap();
        assert_eq!(f.log_lines(), vec!["tether-init", "tether-cleanup"]);
        assert!(!f.manager.catalog().component_dir(&name("iac")).exists());
        assert!(f.lock().get(&name("iac")).is_none());
        assert_eq!(f.manager.state(&name("iac")), LifecycleState::NotInstalled);
    }

    #[tokio::test]
    async fn uninstall_missing_is_not_found() {
        let mut f = Fixture::new();
        let err = f.manager.uninstall(&name("iac")).await.unwrap_err();
        assert!(matches!(err, ComponentError::NotFound(_)));
    }

    #[tokio::test]
    async fn reinstall_after_uninstall() {
        let mut f = Fixture::new();
        let artifact = f.artifact("iac-1", "1.0.0", "");
        f.manager.install(&name("iac"), &artifact).await.unwrap();
        f.manager.uninstall(&name("iac")).await.unwrap();
        f.manager.install(&name("iac"), &artifact).await.unwrap();
        assert_eq!(f.manager.state(&name("iac")), LifecycleState::Active);
    }

    #[tokio::test]
    async fn rollback_keeps_deprecated_flag() {
        let mut f = Fixture::new();
        let v1 = f.artifact("iac-1", "1.0.0", "").with_deprecated(true);
        let v2 = f.artifact("iac-2", "2.0.0", "");
        f.manager.install(&name("iac"), &v1).await.unwrap();
        f.manager.update(&name("iac"), &v2).await.unwrap();
        assert!(f.manager.catalog().previous_deprecated(&name("iac")));

        let c = f.manager.rollback(&name("iac")).await.unwrap();
        assert_eq!(c.version(), &Version::new(1, 0, 0));
        assert_eq!(c.status(), &ComponentStatus::Deprecated);
        assert!(f.lock().get(&name("iac")).unwrap().deprecated);
        assert!(!f.manager.catalog().previous_deprecated(&name("iac")));
    }

    #[tokio::test]
    async fn failed_swap_restores_active_version() {
        let mut f = Fixture::new();
        let v1 = f.artifact("iac-1", "1.0.0", "");
        // Succeeds, but leaves the staged copy without its version file.
        let v2 = f.artifact(
            "iac-2",
            "2.0.0",
            "if [ \"$1\" = tether-reconfigure ]; then rm \"$(dirname \"$0\")/.version\"; fi",
        );
        f.manager.install(&name("iac"), &v1).await.unwrap();

        let err = f.manager.update(&name("iac"), &v2).await.unwrap_err();
        assert!(matches!(err, ComponentError::Io(_)));

        let c = f.manager.get(&name("iac")).unwrap();
        assert_eq!(c.version(), &Version::new(1, 0, 0));
        assert_eq!(c.state(), LifecycleState::Active);
        assert_eq!(c.status(), &ComponentStatus::Installed);
        assert_eq!(
            compute_digest(c.executable()).unwrap(),
            compute_digest(v1.path()).unwrap()
        );
        assert_eq!(
            f.lock().get(&name("iac")).unwrap().version,
            Version::new(1, 0, 0)
        );
        assert!(f.manager.catalog().previous(&name("iac")).is_none());
        assert!(!c.directory().join(INCOMING_PREVIOUS_DIR).exists());
        assert_eq!(f.staging_dirs(), 0);
    }

    #[test]
    fn develop_twice_keeps_component_active() {
        let mut f = Fixture::new();
        f.manager.develop(&name("sandbox"), "wip").unwrap();
        let c = f.manager.develop(&name("sandbox"), "still wip").unwrap();
        assert_eq!(c.state(), LifecycleState::Active);
        assert_eq!(f.manager.state(&name("sandbox")), LifecycleState::Active);
    }

    #[test]
    fn develop_creates_dev_component() {
        let mut f = Fixture::new();
        let c = f.manager.develop(&name("sandbox"), "wip").unwrap();

        assert!(c.provenance().is_dev());
        assert_eq!(c.status(), &ComponentStatus::Development);
        assert_eq!(c.state(), LifecycleState::Active);
        assert_eq!(f.manager.list().unwrap().len(), 1);
        assert!(f.lock().get(&name("sandbox")).is_none());
    }

    #[test]
    fn invalid_version_text() {
        let err = Artifact::parse("/tmp/x", "one.two").unwrap_err();
        assert!(matches!(err, ComponentError::InvalidVersion { .. }));
    }
}
