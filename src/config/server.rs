//! Relay server configuration

use super::TcpConfig;
use crate::protocol::{DEFAULT_RELAY_PORT, HEARTBEAT_INTERVAL_SECS, HEARTBEAT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_listen_addr() -> String {
    format!("0.0.0.0:{}", DEFAULT_RELAY_PORT)
}

fn default_credentials() -> PathBuf {
    PathBuf::from("./data.csv")
}

fn default_heartbeat_interval() -> u64 {
    HEARTBEAT_INTERVAL_SECS
}

fn default_heartbeat_timeout() -> u64 {
    HEARTBEAT_TIMEOUT_SECS
}

/// Relay server configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the relay listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path of the credential file
    #[serde(default = "default_credentials")]
    pub credentials: PathBuf,

    /// Seconds slept between heartbeat reads
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Read deadline in seconds for each heartbeat
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    /// Socket options for accepted and dialed sockets
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: default_listen_addr(),
            credentials: default_credentials(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.trim().is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.heartbeat_timeout_secs == 0 {
            return Err("heartbeat_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
