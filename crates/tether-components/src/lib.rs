//! Tether Components - install, update and remove host components.
//!
//! A component is an executable that the host spawns to do work. This
//! crate owns everything about components at rest:
//!
//! - [`Catalog`]: discovery of `components/<name>/` directories
//! - [`Provenance`]: released, deprecated or development builds
//! - [`LifecycleState`]: the install / reconfigure / cleanup state machine
//! - [`HookRunner`]: runs the hidden `tether-init`, `tether-reconfigure` and
//!   `tether-cleanup` subcommands
//! - [`ComponentLockfile`]: install records with blake3 digests
//! - [`LifecycleManager`]: ties the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use tether_components::{Artifact, Catalog, HookRunner, LifecycleManager};
//! use tether_core::{ComponentName, TetherHome};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let home = TetherHome::resolve()?;
//! let mut manager = LifecycleManager::new(Catalog::new(home.components_dir()), HookRunner::new());
//!
//! let name = ComponentName::new("iac")?;
//! manager.install(&name, &Artifact::parse("./iac", "1.0.0")?).await?;
//! manager.update(&name, &Artifact::parse("./iac-next", "1.1.0")?).await?;
//! manager.rollback(&name).await?;
//! manager.uninstall(&name).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod catalog;
pub mod component;
pub mod error;
pub mod hooks;
pub mod lockfile;
pub mod manager;
pub mod provenance;

pub use catalog::Catalog;
pub use component::{Component, ComponentCapabilities, ComponentStatus, LifecycleState};
pub use error::{ComponentError, ComponentResult};
pub use hooks::{CLEANUP_COMMAND, DEFAULT_HOOK_TIMEOUT, Hook, HookRunner, INIT_COMMAND, RECONFIGURE_COMMAND};
pub use lockfile::{ComponentLockfile, LockedComponent};
pub use manager::{Artifact, LifecycleManager};
pub use provenance::{DEV_VERSION, DevInfo, Provenance};
