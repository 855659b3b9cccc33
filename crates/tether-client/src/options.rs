//! Client configuration.

use std::sync::Arc;
use std::time::Duration;

use tether_core::env;

use crate::logger::{ClientLogger, TracingLogger};

/// Default bound on queued telemetry events.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default time allowed for one telemetry call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Default time allowed to drain telemetry on close.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time allowed to open the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Name sent in the handshake when the host did not provide one.
pub const UNKNOWN_COMPONENT: &str = "unknown";

/// How a [`ComponentClient`](crate::ComponentClient) connects and behaves.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub(crate) target: Option<String>,
    pub(crate) component: String,
    pub(crate) version: String,
    pub(crate) log_level: Option<String>,
    pub(crate) no_cache: bool,
    pub(crate) logger: Arc<dyn ClientLogger>,
    pub(crate) connect_timeout: Duration,
    pub(crate) call_timeout: Duration,
    pub(crate) flush_timeout: Duration,
    pub(crate) queue_capacity: usize,
}

impl ClientOptions {
    /// Options for a component at `version` with nothing else set.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            target: None,
            component: UNKNOWN_COMPONENT.to_string(),
            version: version.into(),
            log_level: None,
            no_cache: false,
            logger: Arc::new(TracingLogger),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Read the host-provided environment.
    ///
    /// Pass `env!("CARGO_PKG_VERSION")` as `version`.
    #[must_use]
    pub fn from_env(version: impl Into<String>) -> Self {
        Self::from_env_with(version, |key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    #[must_use]
    pub fn from_env_with<F>(version: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut options = Self::new(version);
        options.target = non_empty(env::HOST_TARGET);
        if let Some(component) = non_empty(env::COMPONENT_NAME) {
            options.component = component;
        }
        options.log_level = non_empty(env::LOG_LEVEL);
        options.no_cache = lookup(env::NO_CACHE).is_some_and(|v| env::parse_bool(&v));
        options
    }

    /// Host address, overriding `TETHER_HOST_TARGET`.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Component name sent in the handshake.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Logger for the client's own diagnostics.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Skip the cache: reads miss and writes are dropped locally.
    #[must_use]
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    /// Time allowed to open the connection.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Time allowed for one telemetry call.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Time allowed to drain queued telemetry on close.
    #[must_use]
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Bound on queued telemetry events. Zero is treated as one.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Host address, if known.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Component name.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Component version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Log level forwarded by the host (`TETHER_LOG`).
    #[must_use]
    pub fn log_level(&self) -> Option<&str> {
        self.log_level.as_deref()
    }

    /// Whether the cache is disabled for this invocation.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.no_cache
    }
}
