//! Lifecycle hook execution.
//!
//! Hooks are hidden subcommands of the component's own executable. The
//! host runs them with a cleared environment (allowlisted system variables
//! plus configured passthrough) and a timeout. Exit code zero is success.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use semver::Version;
use tether_core::env;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::component::ComponentCapabilities;
use crate::error::{ComponentError, ComponentResult};

/// Subcommand for the Init hook.
pub const INIT_COMMAND: &str = "tether-init";
/// Subcommand for the Reconfigure hook.
pub const RECONFIGURE_COMMAND: &str = "tether-reconfigure";
/// Subcommand for the Cleanup hook.
pub const CLEANUP_COMMAND: &str = "tether-cleanup";

/// Default time a hook may run before it is killed.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

/// A lifecycle transition delivered to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    /// First-time setup after placement.
    Init,
    /// Version change. `to` may be older than `from`.
    Reconfigure {
        /// Version currently active.
        from: Version,
        /// Version being activated.
        to: Version,
    },
    /// Teardown before removal.
    Cleanup,
}

impl Hook {
    /// Hidden subcommand name.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::Init => INIT_COMMAND,
            Self::Reconfigure { .. } => RECONFIGURE_COMMAND,
            Self::Cleanup => CLEANUP_COMMAND,
        }
    }

    /// Full argument list.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Reconfigure { from, to } => vec![
                RECONFIGURE_COMMAND.to_string(),
                from.to_string(),
                to.to_string(),
            ],
            other => vec![other.command().to_string()],
        }
    }
}

/// Runs lifecycle hooks against component executables.
#[derive(Debug, Clone)]
pub struct HookRunner {
    timeout: Duration,
    passthrough: Vec<String>,
    extra_env: Vec<(String, String)>,
}

impl Default for HookRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HOOK_TIMEOUT,
            passthrough: Vec::new(),
            extra_env: Vec::new(),
        }
    }
}

impl HookRunner {
    /// Create a runner with the default timeout and no passthrough.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-hook timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Forward these variables from the host environment. Names blocked by
    /// [`env::is_blocked_passthrough`] are ignored.
    #[must_use]
    pub fn with_passthrough<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passthrough.extend(
            keys.into_iter()
                .map(Into::into)
                .filter(|k| !env::is_blocked_passthrough(k)),
        );
        self
    }

    /// Set an explicit variable for every hook invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_command(
        &self,
        component: &dyn ComponentCapabilities,
        hook: &Hook,
        workdir: Option<&Path>,
    ) -> Command {
        let executable = component.executable();
        let mut cmd = Command::new(executable);
        cmd.args(hook.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = workdir.or_else(|| executable.parent()) {
            cmd.current_dir(dir);
        }

        cmd.env_clear().envs(env::system_vars());
        for var in &self.passthrough {
            if let Ok(value) = std::env::var(var) {
                cmd.env(var, value);
            }
        }
        for (key, value) in &self.extra_env {
            cmd.env(key, value);
        }
        cmd.env(env::COMPONENT_NAME, component.name().as_str());
        cmd
    }

    /// Run `hook` on `component`'s executable.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::HookFailure`] if the process cannot be
    /// started, exits non-zero, or exceeds the timeout.
    pub async fn run(&self, component: &dyn ComponentCapabilities, hook: &Hook) -> ComponentResult<()> {
        self.execute(component, hook, None).await
    }

    /// Run `hook` on `component`'s executable with `workdir` as the working
    /// directory.
    ///
    /// Used when the executable is staged away from the directory the
    /// component keeps its data in.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_in(
        &self,
        component: &dyn ComponentCapabilities,
        hook: &Hook,
        workdir: &Path,
    ) -> ComponentResult<()> {
        self.execute(component, hook, Some(workdir)).await
    }

    async fn execute(
        &self,
        component: &dyn ComponentCapabilities,
        hook: &Hook,
        workdir: Option<&Path>,
    ) -> ComponentResult<()> {
        let hook_name = hook.command();
        debug!(
            component = %component.name(),
            hook = hook_name,
            args = ?hook.args(),
            "Running lifecycle hook"
        );

        let mut cmd = self.build_command(component, hook, workdir);
        let output = match timeout(self.timeout, async { cmd.spawn()?.wait_with_output().await }).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ComponentError::HookFailure {
                    hook: hook_name.to_string(),
                    exit_code: None,
                    message: format!("failed to execute {}: {e}", component.executable().display()),
                });
            },
            Err(_) => {
                return Err(ComponentError::HookFailure {
                    hook: hook_name.to_string(),
                    exit_code: None,
                    message: format!("timed out after {}s", self.timeout.as_secs()),
                });
            },
        };

        if output.status.success() {
            debug!(component = %component.name(), hook = hook_name, "Lifecycle hook succeeded");
            return Ok(());
        }

        let exit_code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(
            component = %component.name(),
            hook = hook_name,
            exit_code = ?exit_code,
            stderr = %stderr,
            "Lifecycle hook failed"
        );

        let message = if stderr.is_empty() {
            "hook exited unsuccessfully".to_string()
        } else {
            stderr
        };
        Err(ComponentError::HookFailure {
            hook: hook_name.to_string(),
            exit_code,
            message,
        })
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Write an executable shell script.
    pub(crate) fn write_script(path: &Path, body: &str) {
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}
