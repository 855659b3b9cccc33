//! Tether CLI - host for versioned subprocess components.
//!
//! Installs, updates, rolls back and removes components, and runs them
//! against a loopback endpoint that serves their cache and telemetry.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tether_core::ComponentName;

mod commands;
mod theme;

use commands::{HostContext, cache, component, run};
use theme::Theme;

/// Tether - host for versioned subprocess components
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage installed components
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },

    /// Run a component with host services
    Run {
        /// Component name
        name: ComponentName,

        /// Arguments passed to the component
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Manage the component cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum ComponentCommands {
    /// List installed components
    List,

    /// Install a component from an executable
    Install {
        /// Component name
        name: ComponentName,
        /// Path to the executable
        path: PathBuf,
        /// Version of the executable
        #[arg(long)]
        version: String,
        /// Mark the build as deprecated
        #[arg(long)]
        deprecated: bool,
        /// Expected digest (`blake3:<hex>`)
        #[arg(long)]
        digest: Option<String>,
    },

    /// Replace an installed component with another version
    Update {
        /// Component name
        name: ComponentName,
        /// Path to the new executable
        path: PathBuf,
        /// Version of the new executable
        #[arg(long)]
        version: String,
        /// Expected digest (`blake3:<hex>`)
        #[arg(long)]
        digest: Option<String>,
    },

    /// Go back to the previous version, or to a given older executable
    Rollback {
        /// Component name
        name: ComponentName,
        /// Executable to roll back to (defaults to the kept previous version)
        #[arg(long, requires = "version")]
        to: Option<PathBuf>,
        /// Version of the `--to` executable
        #[arg(long, requires = "to")]
        version: Option<String>,
    },

    /// Remove a component
    Uninstall {
        /// Component name
        name: ComponentName,
    },

    /// Create or mark a development component
    Dev {
        /// Component name
        name: ComponentName,
        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove every cache entry
    Clear,
    /// Remove expired and unreadable entries
    Prune,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let ctx = HostContext::load()?;

    // Set up logging from config, with --verbose override.
    let mut log_config = ctx.config.logging.clone();
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = tether_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Component { command } => {
            handle_component(&ctx, command).await?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Run { name, args } => run::run_component(&ctx, &name, &args).await,
        Commands::Cache { command } => {
            match command {
                CacheCommands::Clear => cache::clear(&ctx).await?,
                CacheCommands::Prune => cache::prune(&ctx).await?,
            }
            Ok(ExitCode::SUCCESS)
        },
    }
}

async fn handle_component(ctx: &HostContext, command: ComponentCommands) -> Result<()> {
    match command {
        ComponentCommands::List => component::list(ctx),
        ComponentCommands::Install {
            name,
            path,
            version,
            deprecated,
            digest,
        } => component::install(ctx, &name, path, &version, deprecated, digest).await,
        ComponentCommands::Update {
            name,
            path,
            version,
            digest,
        } => component::update(ctx, &name, path, &version, digest).await,
        ComponentCommands::Rollback { name, to, version } => {
            component::rollback(ctx, &name, to.zip(version)).await
        },
        ComponentCommands::Uninstall { name } => component::uninstall(ctx, &name).await,
        ComponentCommands::Dev { name, description } => component::develop(ctx, &name, &description),
    }
}
