//! Remote relay
//!
//! Accepts tunnel connections, keeps one [`Session`] per client IP and
//! relays each negotiated CONNECT request to its destination.

mod dispatcher;
mod heartbeat;
mod negotiate;
mod registry;
mod session;

pub use dispatcher::Dispatcher;
pub use heartbeat::{monitor, HeartbeatSettings};
pub use negotiate::{read_request, send_connect_reply};
pub use registry::SessionRegistry;
pub use session::{Session, SessionContext, SessionState};

use crate::auth::CredentialStore;
use crate::config::ServerConfig;
use crate::resolver::{AddressResolver, SocketOpts};
use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// A bound relay, ready to accept tunnel connections
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    dispatcher: Dispatcher,
}

impl Server {
    /// Bind the listen address from `config` with the given credentials
    pub async fn bind(config: &ServerConfig, credentials: CredentialStore) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let resolver = AddressResolver::resolve_remote(&config.listen_addr)
            .await
            .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;
        let listener = TcpListener::bind(resolver.listen_addr())
            .await
            .with_context(|| format!("Failed to bind {}", resolver.listen_addr()))?;

        let ctx = SessionContext::new(
            Arc::new(credentials),
            resolver,
            HeartbeatSettings::from_config(config),
            SocketOpts::from_tcp_config(&config.tcp),
        );

        Ok(Server {
            listener,
            dispatcher: Dispatcher::new(ctx),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Registry of live sessions
    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.dispatcher.registry().clone()
    }

    /// Serve until shutdown
    pub async fn run(self, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        info!("Relay listening on {}", self.local_addr()?);
        self.dispatcher.run(self.listener, shutdown_rx).await;
        info!("Relay stopped");
        Ok(())
    }
}

/// Load credentials, bind and run the relay until shutdown
pub async fn run_server(config: ServerConfig, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    let credentials = CredentialStore::load(&config.credentials)
        .with_context(|| format!("Failed to load credentials from {:?}", config.credentials))?;
    if credentials.is_empty() {
        tracing::warn!("Credential store is empty, every sign-in will be rejected");
    }

    Server::bind(&config, credentials).await?.run(shutdown_rx).await
}
