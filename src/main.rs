//! Subrelay - Two-Sided Obfuscated TCP Tunnel
//!
//! This is the main entry point for the Subrelay application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use subrelay::auth::{encode_password, encode_username};
use subrelay::config::{load_config, LocalConfig, ServerConfig};
use subrelay::{run_local, run_server};
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Subrelay - obfuscated tunnel with a SOCKS5 CONNECT relay
#[derive(Parser, Debug)]
#[command(name = "subrelay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the local forwarder
    Local {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the remote relay
    Server {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print a credential file line for a user
    Hash {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Hash { username, password } => {
            println!("{},{}", encode_username(&username), encode_password(&password));
            Ok(())
        }
        Command::Local { config } => {
            setup_logging(&args.log_level, args.json_log)?;
            let local: LocalConfig = load_config(&config)?;

            info!("Subrelay v{}", subrelay::VERSION);
            info!("Configuration loaded from: {:?}", config);
            info!("Relay: {}", local.server_addr());

            run_local(local, shutdown_signal()?).await
        }
        Command::Server { config } => {
            setup_logging(&args.log_level, args.json_log)?;
            let server: ServerConfig = load_config(&config)?;

            info!("Subrelay v{}", subrelay::VERSION);
            info!("Configuration loaded from: {:?}", config);

            run_server(server, shutdown_signal()?).await
        }
    }
}

/// Broadcast shutdown on Ctrl+C or SIGTERM
fn shutdown_signal() -> Result<broadcast::Receiver<bool>> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?
    };

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx.send(true);
    });

    Ok(shutdown_rx)
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
