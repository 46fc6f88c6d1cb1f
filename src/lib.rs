//! # Subrelay - Two-Sided Obfuscated TCP Tunnel
//!
//! Subrelay carries application traffic from a local forwarder to a remote
//! relay over a byte-substitution obfuscated channel. The relay performs a
//! SOCKS5 CONNECT on the application's behalf and pipes the bytes through.
//!
//! ## Features
//!
//! - **Per-IP Sessions**: one sign-in and cipher exchange per client address
//! - **Substitution Cipher**: a random byte derangement defeats simple
//!   pattern inspection (it is not encryption)
//! - **Heartbeat Liveness**: a silent client loses its session and every relay under it
//! - **CONNECT Relay**: IPv4, IPv6 and domain destinations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use subrelay::config::{load_config, ServerConfig};
//! use subrelay::server::run_server;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config: ServerConfig = load_config("server.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_server(config, shutdown_rx).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! App (SOCKS5) -> Local forwarder ==obfuscated==> Relay -> Target
//! ```
//!
//! The first connection from a client IP signs in, sends the cipher table
//! and then carries heartbeats. Each later connection carries exactly one
//! CONNECT request and its relayed bytes.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod cipher;
pub mod config;
pub mod error;
pub mod helper;
pub mod local;
pub mod protocol;
pub mod relay;
pub mod resolver;
pub mod server;

// Re-export commonly used items
pub use cipher::CipherTable;
pub use config::{load_config, LocalConfig, ServerConfig};
pub use error::{Socks5Error, TunnelError};
pub use local::run_local;
pub use server::run_server;

/// Version of the Subrelay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
