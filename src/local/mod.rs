//! Local forwarder
//!
//! Signs in to the relay over a control connection, hands it a freshly
//! generated cipher table and keeps the connection alive with heartbeats.
//! Every application connection accepted locally gets its own tunnel
//! connection, relayed with [`Role::Local`]. The application speaks SOCKS5
//! itself; the forwarder only obfuscates the bytes.

mod handshake;
mod heartbeat;

pub use handshake::{send_table, sign_in};
pub use heartbeat::send_heartbeats;

use crate::cipher::CipherTable;
use crate::config::LocalConfig;
use crate::helper::duration_from_secs;
use crate::protocol::{Role, HEARTBEAT_INTERVAL_SECS};
use crate::relay::ConnectionHandler;
use crate::resolver::{AddressResolver, SocketOpts};
use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// A signed-in forwarder with its application listener bound
#[derive(Debug)]
pub struct LocalForwarder {
    resolver: AddressResolver,
    relay_addr: SocketAddr,
    control: TcpStream,
    listener: TcpListener,
    table: Arc<CipherTable>,
    socket_opts: SocketOpts,
    heartbeat_interval: Duration,
}

impl LocalForwarder {
    /// Reach the relay, sign in, send the table and bind the local listener
    pub async fn connect(config: &LocalConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let resolver = AddressResolver::resolve_local(&config.local_addr(), &config.server_addr())
            .await
            .context("Failed to resolve forwarder addresses")?;
        let relay_addr = resolver
            .relay_addr()
            .ok_or_else(|| anyhow!("No relay address configured"))?;
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);

        let mut control = TcpStream::connect(relay_addr)
            .await
            .with_context(|| format!("Failed to connect to relay {}", relay_addr))?;
        socket_opts.hint(&control);

        sign_in(&mut control, &config.username, &config.password)
            .await
            .context("Sign-in failed")?;
        info!("Signed in to relay {}", relay_addr);

        let table = Arc::new(CipherTable::generate());
        send_table(&mut control, &table)
            .await
            .context("Failed to send cipher table")?;

        let listener = TcpListener::bind(resolver.listen_addr())
            .await
            .with_context(|| format!("Failed to bind {}", resolver.listen_addr()))?;

        Ok(LocalForwarder {
            resolver,
            relay_addr,
            control,
            listener,
            table,
            socket_opts,
            heartbeat_interval: duration_from_secs(HEARTBEAT_INTERVAL_SECS),
        })
    }

    /// Override the heartbeat interval
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Address the application listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Cipher table shared with the relay
    pub fn table(&self) -> &Arc<CipherTable> {
        &self.table
    }

    /// Forward application connections until shutdown or until the relay
    /// stops taking heartbeats
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let LocalForwarder {
            resolver,
            relay_addr,
            mut control,
            listener,
            table,
            socket_opts,
            heartbeat_interval,
        } = self;

        info!(
            "Forwarding {} ({}) to relay {}",
            resolver.listen_addr(),
            resolver.role(),
            relay_addr
        );

        let mut heartbeat =
            tokio::spawn(async move { send_heartbeats(&mut control, heartbeat_interval).await });

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((app, peer)) => {
                        socket_opts.hint(&app);
                        tokio::spawn(forward(app, peer, relay_addr, table.clone(), socket_opts.clone()));
                    }
                    Err(e) => {
                        error!("Failed to accept application connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                result = &mut heartbeat => {
                    error!("Lost the relay, stopping forwarder");
                    return match result {
                        Ok(Err(e)) => Err(e).context("Heartbeat to relay failed"),
                        Ok(Ok(())) => Err(anyhow!("Heartbeat sender stopped")),
                        Err(e) => Err(e).context("Heartbeat task failed"),
                    };
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping forwarder");
                    heartbeat.abort();
                    break;
                }
            }
        }

        info!("Forwarder stopped");
        Ok(())
    }
}

/// Tunnel one application connection through a fresh relay connection
async fn forward(
    app: TcpStream,
    peer: SocketAddr,
    relay_addr: SocketAddr,
    table: Arc<CipherTable>,
    socket_opts: SocketOpts,
) {
    let tunnel = match TcpStream::connect(relay_addr).await {
        Ok(tunnel) => tunnel,
        Err(e) => {
            warn!(peer = %peer, "Failed to reach relay {}: {}", relay_addr, e);
            return;
        }
    };
    socket_opts.hint(&tunnel);

    let handler = Arc::new(ConnectionHandler::new(app, tunnel, Role::Local, table));
    let stats = handler.transfer_data().await;
    tracing::debug!(
        peer = %peer,
        "Application connection closed ({} bytes out, {} bytes back)",
        stats.forward_bytes,
        stats.backward_bytes
    );
}

/// Connect to the relay and forward until shutdown
pub async fn run_local(config: LocalConfig, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
    LocalForwarder::connect(&config).await?.run(shutdown_rx).await
}
