//! RPC implementation for the host endpoint.
//!
//! `RpcImpl` implements `CoreRpcServer` by delegating to `*_impl` methods
//! in the cache and telemetry submodules.

mod cache;
mod telemetry;

use chrono::{DateTime, Utc};
use jsonrpsee::types::ErrorObjectOwned;
use tether_protocol::{
    CoreRpcServer, EmitAck, EmitRequest, PingResponse, ReadCacheResponse, WriteCacheResponse,
};
use tracing::info;

use crate::services::HostServices;

/// The jsonrpsee method handler.
pub(super) struct RpcImpl {
    services: HostServices,
}

impl RpcImpl {
    pub(super) fn new(services: HostServices) -> Self {
        Self { services }
    }
}

#[jsonrpsee::core::async_trait]
impl CoreRpcServer for RpcImpl {
    async fn ping(
        &self,
        component: String,
        version: String,
    ) -> Result<PingResponse, ErrorObjectOwned> {
        info!(component = %component, version = %version, "Component connected");
        Ok(PingResponse {
            message: format!("Pong {component}"),
            host_version: self.services.host_version.clone(),
        })
    }

    async fn read_cache(&self, key: String) -> Result<ReadCacheResponse, ErrorObjectOwned> {
        self.read_cache_impl(&key).await
    }

    async fn write_cache(
        &self,
        key: String,
        expires_at: DateTime<Utc>,
        data: String,
    ) -> Result<WriteCacheResponse, ErrorObjectOwned> {
        self.write_cache_impl(&key, expires_at, &data).await
    }

    async fn emit(&self, event: EmitRequest) -> Result<EmitAck, ErrorObjectOwned> {
        Ok(self.emit_impl(event))
    }
}
