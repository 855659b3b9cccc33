//! Loopback JSON-RPC endpoint.
//!
//! One [`HostServer`] serves one component invocation. It binds only to
//! loopback addresses and is stopped once the component exits.

mod rpc;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use jsonrpsee::server::{Server, ServerHandle};
use tether_protocol::{CoreRpcServer, HostTarget};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{HostError, HostResult};
use crate::services::HostServices;
use rpc::RpcImpl;

/// A running RPC endpoint.
#[derive(Debug)]
pub struct HostServer {
    target: HostTarget,
    handle: ServerHandle,
}

impl HostServer {
    /// Bind according to `config` and start serving `services`.
    ///
    /// An explicit `target` is bound exactly. Otherwise ports are tried
    /// upward from `port` on `127.0.0.1`, `port_attempts` times.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] for a target that is not a loopback
    /// address and [`HostError::Bind`] if no address could be bound.
    pub async fn start(config: &ServerConfig, services: HostServices) -> HostResult<Self> {
        let server = match &config.target {
            Some(target) => {
                let target =
                    HostTarget::parse(target).map_err(|e| HostError::Config(e.to_string()))?;
                Server::builder()
                    .build(target.addr())
                    .await
                    .map_err(|e| HostError::Bind(format!("{target}: {e}")))?
            },
            None => bind_first_free(config.port, config.port_attempts).await?,
        };

        let addr = server
            .local_addr()
            .map_err(|e| HostError::Bind(format!("Failed to get address: {e}")))?;
        let target =
            HostTarget::from_socket_addr(addr).map_err(|e| HostError::Bind(e.to_string()))?;

        let handle = server.start(RpcImpl::new(services).into_rpc());
        info!(target = %target, "Host endpoint listening");

        Ok(Self { target, handle })
    }

    /// Address components should dial.
    #[must_use]
    pub fn target(&self) -> &HostTarget {
        &self.target
    }

    /// Bound socket address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.target.addr()
    }

    /// Stop serving and wait for in-flight calls to finish.
    pub async fn stop(self) {
        if self.handle.stop().is_err() {
            debug!(target = %self.target, "Host endpoint already stopped");
        }
        self.handle.stopped().await;
        debug!(target = %self.target, "Host endpoint stopped");
    }
}

async fn bind_first_free(first: u16, attempts: u16) -> HostResult<Server> {
    let attempts = attempts.max(1);
    let mut last_error = None;

    for offset in 0..attempts {
        let Some(port) = first.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        match Server::builder().build(addr).await {
            Ok(server) => return Ok(server),
            Err(e) => {
                debug!(port, error = %e, "Port unavailable");
                last_error = Some(e);
            },
        }
    }

    Err(HostError::Bind(match last_error {
        Some(e) => format!("no free port in {first}+{attempts}: {e}"),
        None => format!("no free port in {first}+{attempts}"),
    }))
}
