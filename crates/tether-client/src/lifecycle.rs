//! Lifecycle hook dispatch for component binaries.
//!
//! The host runs a component's own executable with a hidden subcommand
//! when it installs, updates or removes it. Flatten [`LifecycleCommand`]
//! into the component's CLI and hand the parsed value to
//! [`run_lifecycle_hook`]:
//!
//! ```rust,ignore
//! #[derive(clap::Subcommand)]
//! enum Command {
//!     Scan,
//!     #[command(flatten)]
//!     Lifecycle(tether_client::LifecycleCommand),
//! }
//!
//! match cli.command {
//!     Command::Lifecycle(hook) => tether_client::run_lifecycle_hook(&MyHooks, &hook).await?,
//!     Command::Scan => scan().await?,
//! }
//! ```
//!
//! A hook reports failure by returning an error. The binary should print
//! it to stderr and exit non-zero; the host shows that text to the user.

use async_trait::async_trait;
use clap::Subcommand;

/// Hidden subcommands the host invokes.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum LifecycleCommand {
    /// First-time setup after installation.
    #[command(name = "tether-init", hide = true)]
    Init,

    /// Migration between versions. `new_version` may be older than
    /// `current_version` when rolling back.
    #[command(name = "tether-reconfigure", hide = true)]
    Reconfigure {
        /// Version being replaced.
        current_version: String,
        /// Version taking over.
        new_version: String,
    },

    /// Teardown before removal.
    #[command(name = "tether-cleanup", hide = true)]
    Cleanup,
}

/// A component's lifecycle behavior. Every hook defaults to a no-op.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Called once after installation.
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called on the incoming executable when switching versions.
    async fn reconfigure(&self, _current_version: &str, _new_version: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called before the component is removed.
    async fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Route `command` to the matching hook.
///
/// # Errors
///
/// Returns whatever the hook returned.
pub async fn run_lifecycle_hook(
    hooks: &dyn LifecycleHooks,
    command: &LifecycleCommand,
) -> anyhow::Result<()> {
    match command {
        LifecycleCommand::Init => hooks.init().await,
        LifecycleCommand::Reconfigure {
            current_version,
            new_version,
        } => hooks.reconfigure(current_version, new_version).await,
        LifecycleCommand::Cleanup => hooks.cleanup().await,
    }
}
