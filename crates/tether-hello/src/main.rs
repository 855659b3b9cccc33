//! Sample Tether component.
//!
//! `tether-hello greet <name>` caches each greeting through the host and
//! reports a usage event. The hidden lifecycle subcommands keep a small
//! state file in the component directory.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod state;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::FutureExt as _;
use tether_client::{ClientOptions, ComponentClient, LifecycleCommand, run_lifecycle_hook};
use tether_telemetry::{LogConfig, LogFormat, LogTarget};

use state::HelloHooks;

/// A component that says hello.
#[derive(Parser)]
#[command(name = "tether-hello")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Greet someone, reusing a cached greeting while it is fresh
    Greet {
        /// Who to greet
        name: String,

        /// Seconds a greeting stays cached
        #[arg(long, default_value = "3600")]
        ttl_secs: i64,
    },

    #[command(flatten)]
    Lifecycle(LifecycleCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = ClientOptions::from_env(env!("CARGO_PKG_VERSION"));

    // Diagnostics go to stderr so stdout stays the component's output.
    let log_config = LogConfig::new(options.log_level().unwrap_or("warn"))
        .with_format(LogFormat::Compact)
        .with_target(LogTarget::Stderr);
    if let Err(e) = tether_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Command::Lifecycle(hook) => {
            let dir = std::env::current_dir().context("failed to get current directory")?;
            run_lifecycle_hook(&HelloHooks::new(dir), &hook).await
        },
        Command::Greet { name, ttl_secs } => greet(options, &name, ttl_secs).await,
    }
}

async fn greet(options: ClientOptions, name: &str, ttl_secs: i64) -> Result<()> {
    let started = Instant::now();
    let name = name.to_string();
    ComponentClient::scope_lenient(options, move |client| {
        async move {
            let cached = greet_with(client, &name, ttl_secs).await?;
            client
                .metric("greet")
                .with_attribute("cached", cached.to_string())
                .with_duration(started.elapsed())
                .send();
            Ok(())
        }
        .boxed()
    })
    .await
}

/// Print the greeting for `name`. Returns whether it came from the cache.
async fn greet_with(client: &ComponentClient, name: &str, ttl_secs: i64) -> Result<bool> {
    let key = format!("greeting:{name}");

    let (greeting, cached) = match client.read_cache_as::<String>(&key).await {
        Ok(greeting) => (greeting, true),
        Err(e) => {
            if !e.is_cache_miss() {
                tracing::debug!(error = %e, "Cache unavailable, greeting afresh");
            }
            let greeting = format!("Hello, {name}!");
            let expires_at = chrono::TimeDelta::try_seconds(ttl_secs)
                .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
                .context("--ttl-secs is out of range")?;
            client.write_cache(&key, expires_at, &greeting).await?;
            (greeting, false)
        },
    };

    println!("{greeting}");
    Ok(cached)
}
