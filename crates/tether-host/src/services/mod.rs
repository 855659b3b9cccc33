//! Services exposed to components over RPC.

pub mod cache;
pub mod telemetry;

use std::sync::Arc;

use tether_core::ComponentName;
use tether_storage::{KvStore, StorageResult};
use tether_telemetry::EventSink;

pub use cache::CacheService;
pub use telemetry::TelemetryService;

/// The services behind one RPC endpoint.
#[derive(Debug, Clone)]
pub struct HostServices {
    /// Cache scoped to the connected component.
    pub cache: CacheService,
    /// Telemetry sink.
    pub telemetry: TelemetryService,
    /// Version reported in `ping`.
    pub host_version: String,
}

impl HostServices {
    /// Services for `component`, backed by `store` and `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache namespace is invalid.
    pub fn for_component(
        store: Arc<dyn KvStore>,
        sink: Arc<dyn EventSink>,
        component: Option<&ComponentName>,
    ) -> StorageResult<Self> {
        Ok(Self {
            cache: CacheService::new(store, component)?,
            telemetry: TelemetryService::new(sink),
            host_version: crate::HOST_VERSION.to_string(),
        })
    }

    /// Replace the cache service.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the telemetry service.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryService) -> Self {
        self.telemetry = telemetry;
        self
    }
}
