//! Tether Core - shared types for the Tether host/component protocol.
//!
//! This crate provides:
//! - [`ComponentName`], the validated identity of a component
//! - The environment contract between a host and the subprocesses it spawns
//! - The [`TetherHome`] directory layout used by the host

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod dirs;
pub mod env;
pub mod error;
pub mod name;

pub use dirs::TetherHome;
pub use error::{CoreError, CoreResult};
pub use name::ComponentName;
