//! Error types for Subrelay
//!
//! This module defines all custom error types used by the tunnel core.
//! Process entry points wrap these in `anyhow` with context.

use std::io;
use thiserror::Error;

/// Result alias used throughout the tunnel core
pub type Result<T> = std::result::Result<T, TunnelError>;

/// Main error type for tunnel operations
#[derive(Error, Debug)]
pub enum TunnelError {
    /// IO error (socket read/write failure, short read, peer closed)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Liveness failure detected by the heartbeat monitor
    #[error("Heartbeat error: {0}")]
    Heartbeat(String),

    /// Destination could not be resolved
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Socks5(#[from] Socks5Error),

    /// Operation attempted on a session that is no longer running
    #[error("Session closed")]
    SessionClosed,
}

impl TunnelError {
    /// Whether this error came from the underlying socket rather than
    /// from protocol content.
    pub fn is_transport(&self) -> bool {
        matches!(self, TunnelError::Io(_))
    }
}

/// SOCKS5 specific errors raised during request negotiation
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Command not supported
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Address type not supported
    #[error("Address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid domain name
    #[error("Invalid domain name: {0}")]
    InvalidDomain(String),
}
