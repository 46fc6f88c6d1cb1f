//! Accept dispatcher

use super::registry::SessionRegistry;
use super::session::{Session, SessionContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Routes accepted connections to new or existing sessions
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ctx: Arc<SessionContext>,
}

impl Dispatcher {
    /// Create a dispatcher over a shared session context
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Dispatcher { ctx }
    }

    /// Registry of live sessions
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.ctx.registry()
    }

    /// Hand one accepted connection to the right routine.
    ///
    /// A known IP goes straight to request negotiation. An unknown IP
    /// starts a new session, which must sign in and send its table first.
    /// Either way the work runs in its own task.
    pub fn handle_accept(&self, stream: TcpStream, peer: SocketAddr) {
        self.ctx.socket_opts().hint(&stream);

        match self.ctx.registry().get(&peer.ip()) {
            Some(session) => {
                debug!(peer = %peer, "Request on existing session");
                tokio::spawn(async move {
                    if let Err(e) = session.negotiate(stream).await {
                        warn!(peer = %peer, "Request failed: {}", e);
                    }
                });
            }
            None => {
                info!(peer = %peer, "New session");
                let session = Session::new(peer.ip(), self.ctx.clone());
                tokio::spawn(session.establish(stream));
            }
        }
    }

    /// Accept connections until shutdown, then tear every session down
    pub async fn run(&self, listener: TcpListener, mut shutdown_rx: broadcast::Receiver<bool>) {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.handle_accept(stream, peer),
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping relay");
                    break;
                }
            }
        }

        self.ctx.registry().close_all();
    }
}
