//! usbshare Server
//!
//! USB device sharing command server. Listens on a TCP control socket,
//! answers `list` and `attach` requests, and exports the selected device
//! through the host's usbip stack.

use anyhow::{Context, Result};
use clap::Parser;
use common::{UsbipBindExecutor, create_registry, setup_logging};
use server::config::ServerConfig;
use server::dispatch::Dispatcher;
use server::network::Listener;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "usbshare-server")]
#[command(
    author,
    version,
    about = "usbshare Server - Share USB devices over the network"
)]
#[command(long_about = "
A USB device sharing command server. Clients discover devices with `list`
and export one with `attach`, over a minimal TCP control channel.

EXAMPLES:
    # Run with default config
    usbshare-server

    # Run with custom config
    usbshare-server --config /path/to/config.toml

    # Bind somewhere other than localhost:5000
    usbshare-server --host 0.0.0.0 --port 5005

    # List USB devices without starting the server
    usbshare-server --list-devices

    # Run with debug logging
    usbshare-server --log-level debug

CONFIGURATION:
    The server looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usbshare/server.toml
    3. /etc/usbshare/server.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Host to bind (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ServerConfig::default();
        let path = ServerConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    // Load configuration first (to get log level from config if not specified)
    let mut config = if let Some(ref path) = args.config {
        ServerConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        ServerConfig::load_or_default()
    };

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usbshare Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let registry = Arc::new(create_registry(
        config.usb.enumeration,
        config.usb.details,
    ));

    if args.list_devices {
        return list_devices_mode(registry).await;
    }

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        Arc::new(UsbipBindExecutor::default()),
        std::time::Duration::from_secs(config.server.request_timeout_secs),
    ));

    let (listener, shutdown) = Listener::bind(
        &config.server.host,
        config.server.port,
        dispatcher,
        config.server.max_connections,
    )
    .await
    .context("Failed to start listener")?;

    info!("Press Ctrl+C to shutdown");

    let server_handle = tokio::spawn(listener.run());

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(e) => {
            error!("Error waiting for Ctrl+C: {}", e);
        }
    }

    shutdown.shutdown();
    server_handle
        .await
        .context("Listener task panicked")?
        .context("Listener failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// List USB devices and exit
async fn list_devices_mode(registry: Arc<common::DeviceRegistry>) -> Result<()> {
    info!("Listing USB devices...");

    let devices = tokio::task::spawn_blocking(move || registry.snapshot())
        .await
        .context("snapshot task failed")?
        .context("Failed to enumerate devices")?;

    if devices.is_empty() {
        println!("No USB devices found.");
    } else {
        println!("Found {} USB device(s):\n", devices.len());
        for device in devices {
            println!("  {}", device);
        }
    }

    Ok(())
}
