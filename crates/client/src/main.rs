//! usbshare Client
//!
//! Command-line client for the usbshare server: list the devices a remote
//! host is sharing, or request that one be attached. `list --local`
//! enumerates this machine directly without a server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::config::ClientConfig;
use client::network::CommandClient;
use common::{create_registry, setup_logging};
use protocol::AttachArgs;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "usbshare-client")]
#[command(author, version, about = "usbshare Client - Access remote USB devices")]
#[command(long_about = "
Command-line client for a usbshare server.

EXAMPLES:
    # List devices shared by the default server (localhost:5000)
    usbshare-client list

    # List devices attached to this machine, no server involved
    usbshare-client list --local

    # Attach a device by vendor:product id
    usbshare-client attach --id 0bda:5400

    # Attach by description substring, taking the first match
    usbshare-client attach --desc Hub --first --host usb-host.local

CONFIGURATION:
    The client looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usbshare/client.toml
    3. /etc/usbshare/client.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Server host (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the devices the server is sharing
    List {
        /// Enumerate this machine directly instead of asking a server
        #[arg(long)]
        local: bool,
    },
    /// Attach the device matching the given selector
    Attach {
        /// Vendor:product id, e.g. 0bda:5400
        #[arg(long, value_name = "VID:PID")]
        id: Option<String>,

        /// Exact bus id, e.g. 1-2.3
        #[arg(long, value_name = "BUSID")]
        bus: Option<String>,

        /// Exact serial number
        #[arg(long, value_name = "SERIAL")]
        serial: Option<String>,

        /// Case-insensitive description substring
        #[arg(long, value_name = "SUBSTR")]
        desc: Option<String>,

        /// On an ambiguous match, take the first candidate instead of failing
        #[arg(long)]
        first: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = if let Some(ref path) = args.config {
        ClientConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        ClientConfig::load_or_default()
    };

    if let Some(host) = args.host {
        config.client.host = host;
    }
    if let Some(port) = args.port {
        config.client.port = port;
    }

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.client.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    let outcome = match args.command {
        Command::List { local: true } => list_local(&config).await,
        Command::List { local: false } => {
            list_remote(&CommandClient::new(&config.client.host, config.client.port)).await
        }
        Command::Attach {
            id,
            bus,
            serial,
            desc,
            first,
        } => {
            let client = CommandClient::new(&config.client.host, config.client.port);
            client
                .attach(AttachArgs {
                    id,
                    bus,
                    serial,
                    description: desc,
                    first,
                })
                .await
                .map(|()| println!("OK"))
        }
    };

    // Report the failure on stdout and exit 1, per the CLI contract.
    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            println!("{:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn list_remote(client: &CommandClient) -> Result<()> {
    let devices = client.list().await?;
    print_devices(&devices);
    Ok(())
}

async fn list_local(config: &ClientConfig) -> Result<()> {
    let registry = create_registry(config.usb.enumeration, config.usb.details);
    let devices = tokio::task::spawn_blocking(move || registry.snapshot())
        .await
        .context("snapshot task failed")?
        .context("Failed to enumerate devices")?;
    print_devices(&devices);
    Ok(())
}

fn print_devices(devices: &[protocol::DeviceDescriptor]) {
    if devices.is_empty() {
        println!("No USB devices found.");
        return;
    }
    for device in devices {
        println!("{}", device);
    }
}
