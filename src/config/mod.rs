//! Configuration module for Subrelay
//!
//! Both process roles load their configuration once at startup. JSON files
//! (`.json`) use the local forwarder's established key names; everything
//! else is read as TOML.

mod local;
mod server;
mod tcp;

pub use local::LocalConfig;
pub use server::ServerConfig;
pub use tcp::TcpConfig;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// On-disk configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document
    Json,
    /// TOML document
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Load configuration from a file
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse configuration from a string in the given format
pub fn parse_config<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T> {
    match format {
        ConfigFormat::Json => {
            serde_json::from_str(content).with_context(|| "Failed to parse JSON configuration")
        }
        ConfigFormat::Toml => {
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
        }
    }
}
