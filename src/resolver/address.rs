//! Role-aware address resolver

use crate::error::{Result, TunnelError};
use crate::protocol::{Role, TargetAddr};
use std::net::SocketAddr;

/// Listen/relay addresses of this process and destination parsing
///
/// A local instance knows where the relay is; a remote instance learns
/// each destination from the request it negotiates. The role never changes
/// after construction.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    role: Role,
    listen_addr: SocketAddr,
    relay_addr: Option<SocketAddr>,
}

impl AddressResolver {
    /// Resolver for the local forwarder
    pub fn local(listen_addr: SocketAddr, relay_addr: SocketAddr) -> Self {
        AddressResolver {
            role: Role::Local,
            listen_addr,
            relay_addr: Some(relay_addr),
        }
    }

    /// Resolver for the remote relay
    pub fn remote(listen_addr: SocketAddr) -> Self {
        AddressResolver {
            role: Role::Remote,
            listen_addr,
            relay_addr: None,
        }
    }

    /// Build a local resolver from `host:port` strings
    pub async fn resolve_local(listen_addr: &str, relay_addr: &str) -> Result<Self> {
        Ok(Self::local(
            lookup(listen_addr).await?,
            lookup(relay_addr).await?,
        ))
    }

    /// Build a remote resolver from a `host:port` string
    pub async fn resolve_remote(listen_addr: &str) -> Result<Self> {
        Ok(Self::remote(lookup(listen_addr).await?))
    }

    /// Role of this process
    pub fn role(&self) -> Role {
        self.role
    }

    /// Address this process listens on
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Relay address; only known to a local instance
    pub fn relay_addr(&self) -> Option<SocketAddr> {
        match self.role {
            Role::Local => self.relay_addr,
            Role::Remote => None,
        }
    }

    /// Turn a decoded request into a concrete endpoint.
    ///
    /// Domain names go through the system resolver.
    pub async fn parse_destination(&self, request: &[u8]) -> Result<SocketAddr> {
        let target = TargetAddr::from_request(request)?;
        target.resolve().await
    }
}

async fn lookup(addr: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(addr)
        .await
        .map_err(|e| TunnelError::Resolve(format!("{}: {}", addr, e)))?
        .next()
        .ok_or_else(|| TunnelError::Resolve(format!("no addresses for {}", addr)))
}
