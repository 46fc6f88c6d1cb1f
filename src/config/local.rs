//! Local forwarder configuration

use super::TcpConfig;
use serde::{Deserialize, Serialize};

/// Default listen host for the application-facing socket
fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

/// Default timeout in seconds
fn default_timeout() -> u64 {
    300
}

/// Local forwarder configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalConfig {
    /// Relay host name or address
    pub server: String,

    /// Relay port
    pub server_port: u16,

    /// Port the application connects to
    pub local_port: u16,

    /// Host the application listener binds to
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Username presented to the relay
    pub username: String,

    /// Password presented to the relay
    pub password: String,

    /// Timeout in seconds. Kept for config-file compatibility; the tunnel
    /// itself applies no timeout besides the heartbeat deadline.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Socket options for the tunnel and application sockets
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl LocalConfig {
    /// Relay address as `host:port`
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server, self.server_port)
    }

    /// Application listener address as `host:port`
    pub fn local_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.local_port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.trim().is_empty() {
            return Err("server must not be empty".to_string());
        }
        if self.server_port == 0 {
            return Err("server_port must not be 0".to_string());
        }
        if self.local_port == 0 {
            return Err("local_port must not be 0".to_string());
        }
        if self.username.is_empty() {
            return Err("username must not be empty".to_string());
        }
        if self.timeout == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
