//! Runewell host entry point.
//!
//! ```bash
//! # Start the host with the default config search path
//! cargo run --bin runewell-host
//!
//! # With an explicit config and debug logging
//! RUST_LOG=debug cargo run --bin runewell-host -- /etc/runewell/runewell.toml
//! ```

use anyhow::Result;
use runewell_capability_core::CapabilityRegistry;
use runewell_host::bootstrap::{Host, HOST_VERSION};
use runewell_host::config::HostConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CONFIG_PATH: &str = "runewell.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        HostConfig::load(&config_path)?
    } else {
        HostConfig::default()
    };

    // RUST_LOG wins over the configured level.
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.host.log_level.clone())),
        )
        .with_target(true)
        .init();

    info!("Starting runewell-host v{HOST_VERSION}");
    info!("Config: {config_path}");

    let registry = CapabilityRegistry::attach();
    let mut host = Host::start(&config, registry).await?;

    info!(
        "Host startup complete; {} script global(s) bound",
        host.scope.names().len()
    );
    info!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    host.shutdown().await;
    info!("Host stopped");
    Ok(())
}
