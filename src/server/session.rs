//! Per-client session state machine
//!
//! ```text
//! New -> Authenticating -> TableExchange -> Active -> Closed
//! ```
//!
//! A session is created by the first connection from an unknown IP. That
//! connection signs in, delivers the cipher table and then carries
//! heartbeats for the rest of the session. Later connections from the same
//! IP each negotiate one CONNECT request and become a relay.

use super::heartbeat::{monitor, HeartbeatSettings};
use super::negotiate::{read_request, send_connect_reply};
use super::registry::SessionRegistry;
use crate::auth::CredentialStore;
use crate::cipher::{CipherTable, TABLE_SIZE};
use crate::error::{Result, TunnelError};
use crate::helper::{read_array, write_field};
use crate::protocol::{Role, CREDENTIAL_FIELD_LEN, FAIL, SUCCESS};
use crate::relay::ConnectionHandler;
use crate::resolver::{AddressResolver, SocketOpts};
use dashmap::DashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing read yet
    New,
    /// Reading credentials
    Authenticating,
    /// Reading the cipher table
    TableExchange,
    /// Heartbeat running, requests accepted
    Active,
    /// Torn down
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::New => "new",
            SessionState::Authenticating => "authenticating",
            SessionState::TableExchange => "table-exchange",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Everything sessions of one relay share
#[derive(Debug)]
pub struct SessionContext {
    registry: Arc<SessionRegistry>,
    credentials: Arc<CredentialStore>,
    resolver: AddressResolver,
    heartbeat: HeartbeatSettings,
    socket_opts: SocketOpts,
}

impl SessionContext {
    /// Bundle the relay-wide collaborators
    pub fn new(
        credentials: Arc<CredentialStore>,
        resolver: AddressResolver,
        heartbeat: HeartbeatSettings,
        socket_opts: SocketOpts,
    ) -> Arc<Self> {
        Arc::new(SessionContext {
            registry: Arc::new(SessionRegistry::new()),
            credentials,
            resolver,
            heartbeat,
            socket_opts,
        })
    }

    /// Registry of live sessions
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Socket options applied to accepted and dialed sockets
    pub fn socket_opts(&self) -> &SocketOpts {
        &self.socket_opts
    }
}

/// Authenticated state of one client IP
pub struct Session {
    ip: IpAddr,
    state: watch::Sender<SessionState>,
    username: OnceLock<String>,
    password: OnceLock<String>,
    table: OnceLock<Arc<CipherTable>>,
    handlers: DashMap<u64, Arc<ConnectionHandler>>,
    next_handler_id: AtomicU64,
    ctx: Arc<SessionContext>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ip", &self.ip)
            .field("state", &self.state())
            .field("active_connections", &self.active_connections())
            .finish()
    }
}

impl Session {
    /// Create a session for a client IP in the `New` state
    pub fn new(ip: IpAddr, ctx: Arc<SessionContext>) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::New);
        Arc::new(Session {
            ip,
            state,
            username: OnceLock::new(),
            password: OnceLock::new(),
            table: OnceLock::new(),
            handlers: DashMap::new(),
            next_handler_id: AtomicU64::new(0),
            ctx,
        })
    }

    /// Client IP
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Username digest the client signed in with
    pub fn username(&self) -> Option<&str> {
        self.username.get().map(String::as_str)
    }

    /// Password digest the client signed in with
    pub fn password(&self) -> Option<&str> {
        self.password.get().map(String::as_str)
    }

    /// Cipher table of this session; empty until the exchange completes
    pub fn table(&self) -> Arc<CipherTable> {
        self.table
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(CipherTable::empty()))
    }

    /// Number of relays currently running under this session
    pub fn active_connections(&self) -> usize {
        self.handlers.len()
    }

    /// Serve the first connection of a new client: sign in, receive the
    /// table, then watch heartbeats until the peer goes quiet.
    pub async fn establish(self: Arc<Self>, mut stream: TcpStream) {
        if let Err(e) = self.sign_in(&mut stream).await {
            warn!(peer = %self.ip, "Sign-in failed: {}", e);
            return;
        }

        if let Err(e) = self.exchange_table(&mut stream).await {
            warn!(peer = %self.ip, "Table exchange failed: {}", e);
            self.teardown();
            return;
        }

        info!(peer = %self.ip, "Session active");
        self.run_heartbeat(&mut stream).await;
    }

    /// Read the two credential digests and answer with a verdict.
    ///
    /// Registers the session under its IP on success. On failure the FAIL
    /// sentinel is sent and the session closes without ever being registered.
    pub async fn sign_in<S>(self: &Arc<Self>, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + ?Sized,
    {
        self.advance(SessionState::New, SessionState::Authenticating)?;

        let result = self.check_credentials(stream).await;
        if result.is_err() {
            self.close();
            return result;
        }

        self.ctx.registry.insert(self.ip, self.clone());
        info!(peer = %self.ip, "Session registered");
        Ok(())
    }

    async fn check_credentials<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + ?Sized,
    {
        let username = field_to_string(&read_array::<CREDENTIAL_FIELD_LEN, _>(stream).await?);
        let password = field_to_string(&read_array::<CREDENTIAL_FIELD_LEN, _>(stream).await?);

        if !self.ctx.credentials.verify(&username, &password) {
            write_field(stream, &FAIL).await?;
            return Err(TunnelError::Auth(format!("rejected client {}", self.ip)));
        }

        write_field(stream, &SUCCESS).await?;
        let _ = self.username.set(username);
        let _ = self.password.set(password);
        Ok(())
    }

    /// Receive the 256-byte encode table, then the 256-byte decode table.
    ///
    /// The tables are stored as sent; the client generated them.
    pub async fn exchange_table<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        self.advance(SessionState::Authenticating, SessionState::TableExchange)?;

        let encode = read_array::<TABLE_SIZE, _>(stream).await?;
        let decode = read_array::<TABLE_SIZE, _>(stream).await?;
        let _ = self.table.set(Arc::new(CipherTable::from_parts(encode, decode)));

        self.advance(SessionState::TableExchange, SessionState::Active)?;
        debug!(peer = %self.ip, "Cipher table received");
        Ok(())
    }

    /// Monitor heartbeats on the control stream, tearing the session down
    /// when they stop.
    pub async fn run_heartbeat<S>(&self, stream: &mut S)
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        let mut state = self.state.subscribe();
        tokio::select! {
            reason = monitor(stream, self.ctx.heartbeat) => {
                warn!(peer = %self.ip, "Heartbeat lost: {}", reason);
            }
            _ = state.wait_for(|s| *s == SessionState::Closed) => {
                debug!(peer = %self.ip, "Session closed, heartbeat monitor stopped");
            }
        }
        self.teardown();
    }

    /// Negotiate one CONNECT request on a new connection and relay it.
    ///
    /// Failures end this request only; the session stays up.
    pub async fn negotiate(self: Arc<Self>, mut client: TcpStream) -> Result<()> {
        self.wait_active().await?;
        let table = self.table();

        let request = read_request(&mut client, &table).await?;
        let target = self.ctx.resolver.parse_destination(&request).await?;

        let upstream = TcpStream::connect(target).await.map_err(|e| {
            TunnelError::Connection(format!("failed to connect to {}: {}", target, e))
        })?;
        self.ctx.socket_opts.hint(&upstream);

        send_connect_reply(&mut client, &table).await?;
        info!(peer = %self.ip, target = %target, "Relay established");

        let handler = Arc::new(ConnectionHandler::new(client, upstream, Role::Remote, table));
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, handler.clone());

        // Teardown may have drained the set just before the insert.
        if self.state() == SessionState::Closed {
            handler.abort();
        }

        let stats = handler.transfer_data().await;
        self.handlers.remove(&id);
        debug!(
            peer = %self.ip,
            target = %target,
            "Relay closed ({} bytes out, {} bytes back)",
            stats.forward_bytes,
            stats.backward_bytes
        );
        Ok(())
    }

    /// Mark the session closed. Returns `true` only for the first call.
    pub fn close(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        })
    }

    /// Close the session, abort every relay under it and drop it from the
    /// registry.
    pub fn teardown(&self) {
        self.close();

        let handlers: Vec<Arc<ConnectionHandler>> = self
            .handlers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handler in &handlers {
            handler.abort();
        }
        self.handlers.clear();

        if self.ctx.registry.remove_if_same(&self.ip, self) {
            info!(
                peer = %self.ip,
                "Session removed, {} relays aborted",
                handlers.len()
            );
        }
    }

    fn advance(&self, from: SessionState, to: SessionState) -> Result<()> {
        let moved = self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });

        if moved {
            Ok(())
        } else if self.state() == SessionState::Closed {
            Err(TunnelError::SessionClosed)
        } else {
            Err(TunnelError::Protocol(format!(
                "session is {}, expected {}",
                self.state(),
                from
            )))
        }
    }

    async fn wait_active(&self) -> Result<()> {
        let mut state = self.state.subscribe();
        let reached = state
            .wait_for(|s| matches!(s, SessionState::Active | SessionState::Closed))
            .await
            .map(|s| *s)
            .unwrap_or(SessionState::Closed);

        match reached {
            SessionState::Active => Ok(()),
            _ => Err(TunnelError::SessionClosed),
        }
    }
}

/// Credential field as text, without its zero padding
fn field_to_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
