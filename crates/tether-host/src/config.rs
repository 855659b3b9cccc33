//! Host configuration.
//!
//! Loaded from `<home>/tether.toml`. Every section and field is optional:
//!
//! ```toml
//! [server]
//! port = 1123
//! port_attempts = 20
//!
//! [cache]
//! enabled = true
//! backend = "surrealkv"
//!
//! [telemetry]
//! enabled = true
//!
//! [components]
//! hook_timeout_secs = 60
//! passthrough_env = ["AWS_PROFILE"]
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_components::HookRunner;
use tether_core::env;
use tether_telemetry::LogConfig;

use crate::error::HostResult;

/// Main host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// RPC endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Component lifecycle settings.
    #[serde(default)]
    pub components: ComponentsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,
}

/// Where the RPC endpoint listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// First loopback port to try. `0` lets the OS pick.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How many consecutive ports to try before giving up.
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,

    /// Exact loopback address to bind, overriding `port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            port_attempts: default_port_attempts(),
            target: None,
        }
    }
}

impl ServerConfig {
    /// Let the OS pick a free port.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            port_attempts: 1,
            target: None,
        }
    }
}

/// Cache store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Persistent `SurrealKV` store under `<home>/cache.db`.
    #[default]
    Surrealkv,
    /// Process-local map, discarded when the host exits.
    Memory,
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false, reads always miss and writes are no-ops.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Store backend.
    #[serde(default)]
    pub backend: CacheBackend,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::default(),
        }
    }
}

/// Telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// When false, events are acknowledged and dropped.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Append events as JSON lines to this file instead of the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            events_file: None,
        }
    }
}

/// Component lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentsConfig {
    /// Seconds a lifecycle hook may run.
    #[serde(default = "default_hook_timeout")]
    pub hook_timeout_secs: u64,

    /// Host variables forwarded to components and their hooks.
    #[serde(default)]
    pub passthrough_env: Vec<String>,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            hook_timeout_secs: default_hook_timeout(),
            passthrough_env: Vec::new(),
        }
    }
}

impl ComponentsConfig {
    /// Hook timeout as a duration.
    #[must_use]
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }

    /// Hook runner configured from these settings.
    #[must_use]
    pub fn hook_runner(&self) -> HookRunner {
        HookRunner::new()
            .with_timeout(self.hook_timeout())
            .with_passthrough(self.passthrough_env.iter().cloned())
    }
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> HostResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> HostResult<Self> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` in place of the process environment.
    ///
    /// - `TETHER_HOST_TARGET` sets `server.target`
    /// - `TETHER_NOCACHE=true` disables the cache
    /// - `TETHER_LOG` sets `logging.level`
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(target) = lookup(env::HOST_TARGET).filter(|t| !t.trim().is_empty()) {
            self.server.target = Some(target);
        }
        if lookup(env::NO_CACHE).is_some_and(|v| env::parse_bool(&v)) {
            self.cache.enabled = false;
        }
        if let Some(level) = lookup(env::LOG_LEVEL).filter(|l| !l.trim().is_empty()) {
            self.logging.level = level;
        }
    }
}

fn default_port() -> u16 {
    1123
}

fn default_port_attempts() -> u16 {
    20
}

fn default_true() -> bool {
    true
}

fn default_hook_timeout() -> u64 {
    60
}
