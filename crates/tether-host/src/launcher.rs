//! Component invocation.
//!
//! Each run gets its own endpoint whose cache is scoped to the component.
//! The subprocess sees a scrubbed environment: the system allowlist, the
//! configured passthrough names and the `TETHER_*` contract variables.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tether_components::{Component, ComponentCapabilities, ComponentStatus};
use tether_core::env::{self, ComponentEnv};
use tether_core::TetherHome;
use tether_storage::KvStore;
use tether_telemetry::{EventSink, JsonLinesSink, TracingSink};
use tracing::{debug, info, warn};

use crate::config::{CacheBackend, HostConfig};
use crate::error::{HostError, HostResult};
use crate::server::HostServer;
use crate::services::{CacheService, HostServices, TelemetryService};

/// Open the cache store selected by `config`.
///
/// # Errors
///
/// Returns an error if the persistent store cannot be opened.
pub fn open_store(config: &HostConfig, home: &TetherHome) -> HostResult<Arc<dyn KvStore>> {
    match config.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(tether_storage::MemoryKvStore::new())),
        CacheBackend::Surrealkv => {
            let path = home.cache_db_path();
            debug!(path = %path.display(), "Opening cache store");
            Ok(Arc::new(tether_storage::SurrealKvStore::open(path)?))
        },
    }
}

/// Open the telemetry sink selected by `config`.
///
/// # Errors
///
/// Returns an error if the events file cannot be opened.
pub fn open_sink(config: &HostConfig) -> HostResult<Arc<dyn EventSink>> {
    match &config.telemetry.events_file {
        Some(path) => {
            let sink = JsonLinesSink::open(path)
                .map_err(|e| HostError::Config(format!("telemetry events file: {e}")))?;
            Ok(Arc::new(sink))
        },
        None => Ok(Arc::new(TracingSink)),
    }
}

/// Runs components against a host endpoint.
#[derive(Clone)]
pub struct Launcher {
    config: HostConfig,
    store: Arc<dyn KvStore>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("config", &self.config)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Launcher backed by `store` and `sink`.
    #[must_use]
    pub fn new(config: HostConfig, store: Arc<dyn KvStore>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            store,
            sink,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Run `component` with `args` and wait for it to exit.
    ///
    /// Standard streams are inherited. The endpoint is stopped before
    /// returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Launch`] if the component is tainted or cannot
    /// be spawned, and a bind or storage error if the endpoint cannot be
    /// started.
    pub async fn run(&self, component: &Component, args: &[String]) -> HostResult<ExitStatus> {
        let name = component.name();
        match component.status() {
            ComponentStatus::Tainted { reason } => {
                return Err(HostError::Launch(format!(
                    "{name} is tainted ({reason}); reinstall it before running"
                )));
            },
            ComponentStatus::Deprecated => {
                warn!(component = %name, version = %component.version(), "Component is deprecated");
            },
            ComponentStatus::Installed | ComponentStatus::Development => {},
        }

        let server = HostServer::start(&self.config.server, self.services(component)?).await?;

        let component_env = ComponentEnv::new(server.target().to_string(), name.clone())
            .with_log_level(self.config.logging.level.clone())
            .with_no_cache(!self.config.cache.enabled)
            .with_host_version(crate::HOST_VERSION)
            .with_passthrough_from_process(&self.config.components.passthrough_env);

        let mut cmd = component.command();
        cmd.args(args)
            .env_clear()
            .envs(env::system_vars())
            .envs(component_env.to_vars())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        info!(component = %name, version = %component.version(), target = %server.target(), "Launching component");
        let result = match cmd.spawn() {
            Ok(mut child) => child.wait().await.map_err(HostError::from),
            Err(e) => Err(HostError::Launch(format!(
                "failed to execute {}: {e}",
                component.executable().display()
            ))),
        };
        server.stop().await;

        let status = result?;
        debug!(component = %name, status = %status, "Component exited");
        Ok(status)
    }

    fn services(&self, component: &Component) -> HostResult<HostServices> {
        let cache = if self.config.cache.enabled {
            CacheService::new(Arc::clone(&self.store), Some(component.name()))?
        } else {
            CacheService::disabled()
        };
        let telemetry =
            TelemetryService::new(Arc::clone(&self.sink)).with_enabled(self.config.telemetry.enabled);
        Ok(HostServices {
            cache,
            telemetry,
            host_version: crate::HOST_VERSION.to_string(),
        })
    }
}
