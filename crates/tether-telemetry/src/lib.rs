//! Tether Telemetry - logging and usage events.
//!
//! This crate provides:
//! - Configurable `tracing` setup with multiple formats and targets
//! - [`TelemetryEvent`], the host-side record of a component's usage or
//!   error report
//! - [`EventSink`] implementations that consume those events
//!
//! # Example
//!
//! ```rust,no_run
//! use tether_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), tether_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("tether_host=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Host starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod event;
mod logging;
mod sink;

pub use error::{TelemetryError, TelemetryResult};
pub use event::{EventKind, TelemetryEvent};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
pub use sink::{EventSink, JsonLinesSink, MemorySink, TracingSink};
