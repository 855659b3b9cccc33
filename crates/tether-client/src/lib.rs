//! Tether Client - the library a component links to talk to its host.
//!
//! A component started by a Tether host finds the host endpoint in its
//! environment, connects once, and gets:
//!
//! - an expiring key/value cache (`read_cache`, `write_cache`)
//! - fire-and-forget usage and error telemetry (`metric`, `metric_error`)
//! - dispatch of the hidden lifecycle subcommands ([`LifecycleCommand`])
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use tether_client::{ClientOptions, ComponentClient};
//!
//! # async fn run() -> Result<(), tether_client::ClientError> {
//! let options = ClientOptions::from_env(env!("CARGO_PKG_VERSION"));
//! let client = ComponentClient::connect_lenient(options).await;
//!
//! let projects: Vec<String> = match client.read_cache_as("projects").await {
//!     Ok(cached) => cached,
//!     Err(e) if e.is_cache_miss() => {
//!         let fresh = vec!["a".to_string(), "b".to_string()];
//!         client
//!             .write_cache("projects", Utc::now() + Duration::hours(1), &fresh)
//!             .await?;
//!         fresh
//!     },
//!     Err(e) => return Err(e),
//! };
//!
//! client
//!     .metric("list-projects")
//!     .with_attribute("count", projects.len().to_string())
//!     .send();
//! client.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod client;
mod error;
mod lifecycle;
mod logger;
mod options;
mod telemetry;

pub use client::ComponentClient;
pub use error::{ClientError, ClientResult};
pub use lifecycle::{LifecycleCommand, LifecycleHooks, run_lifecycle_hook};
pub use logger::{ClientLogger, NoopLogger, StderrLogger, TracingLogger};
pub use options::{
    ClientOptions, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FLUSH_TIMEOUT,
    DEFAULT_QUEUE_CAPACITY, UNKNOWN_COMPONENT,
};
pub use telemetry::MetricBuilder;
