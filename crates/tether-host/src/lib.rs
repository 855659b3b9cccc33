//! Tether Host - the side of the protocol that owns components.
//!
//! The host:
//! - Serves a loopback JSON-RPC endpoint per component invocation
//! - Backs the endpoint with a namespaced expiring cache and a telemetry sink
//! - Spawns components with a scrubbed environment and waits for them
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_host::{HostConfig, Launcher, open_sink, open_store};
//!
//! let home = tether_core::TetherHome::resolve()?;
//! let config = HostConfig::load_or_default(home.config_path())?;
//! let launcher = Launcher::new(config.clone(), open_store(&config, &home)?, open_sink(&config)?);
//! let status = launcher.run(&component, &args).await?;
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod launcher;
pub mod server;
pub mod services;

pub use config::{
    CacheBackend, CacheConfig, ComponentsConfig, HostConfig, ServerConfig, TelemetryConfig,
};
pub use error::{HostError, HostResult};
pub use launcher::{Launcher, open_sink, open_store};
pub use server::HostServer;
pub use services::{CacheService, HostServices, TelemetryService};

/// Version of this host, reported to components in `ping`.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");
