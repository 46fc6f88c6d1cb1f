//! Paired-socket connection handler

use super::guard::SocketGuard;
use super::transfer::transfer;
use crate::cipher::{CipherTable, Transform};
use crate::protocol::{Direction, Role};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bytes moved by a finished handler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Client to target
    pub forward_bytes: u64,
    /// Target to client
    pub backward_bytes: u64,
}

/// Relays one client connection to its target.
///
/// The client socket is the Forward source and the target socket the
/// Backward source. Which side of a direction gets encoded or decoded is
/// decided by [`Transform::select`] from the handler's role.
#[derive(Debug)]
pub struct ConnectionHandler {
    client: SocketGuard,
    target: SocketGuard,
    role: Role,
    table: Arc<CipherTable>,
}

impl ConnectionHandler {
    /// Pair a client socket with its target
    pub fn new(client: TcpStream, target: TcpStream, role: Role, table: Arc<CipherTable>) -> Self {
        ConnectionHandler {
            client: SocketGuard::new(client),
            target: SocketGuard::new(target),
            role,
            table,
        }
    }

    /// Whether both sockets have been closed
    pub fn is_closed(&self) -> bool {
        self.client.is_closed() && self.target.is_closed()
    }

    /// Run both relay directions to completion.
    ///
    /// A direction that ends closes its own source socket. Once the first
    /// direction finishes the other is aborted, so a peer that never closes
    /// cannot keep the handler alive.
    pub async fn transfer_data(self: Arc<Self>) -> RelayStats {
        let mut forward = self.spawn_direction(Direction::Forward);
        let mut backward = self.spawn_direction(Direction::Backward);

        let (forward_bytes, backward_bytes) = tokio::select! {
            done = &mut forward => {
                self.abort();
                (joined(done), joined(backward.await))
            }
            done = &mut backward => {
                self.abort();
                (joined(forward.await), joined(done))
            }
        };

        debug!(
            "Relay finished: {} bytes forward, {} bytes backward",
            forward_bytes, backward_bytes
        );

        RelayStats {
            forward_bytes,
            backward_bytes,
        }
    }

    /// Close both sockets without waiting for the relay loops
    pub fn abort(&self) {
        self.client.close();
        self.target.close();
    }

    fn spawn_direction(self: &Arc<Self>, direction: Direction) -> JoinHandle<u64> {
        let handler = self.clone();
        tokio::spawn(async move {
            let (src, dst) = match direction {
                Direction::Forward => (&handler.client, &handler.target),
                Direction::Backward => (&handler.target, &handler.client),
            };
            let transform = Transform::select(handler.role, direction);

            let bytes = transfer(src, dst, &handler.table, transform).await;
            src.close();
            debug!("{} relay done after {} bytes", direction, bytes);
            bytes
        })
    }
}

fn joined(result: Result<u64, tokio::task::JoinError>) -> u64 {
    result.unwrap_or_else(|e| {
        warn!("Relay task failed: {}", e);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    /// Returns (app end, handler, target end)
    async fn setup(role: Role, table: Arc<CipherTable>) -> (TcpStream, Arc<ConnectionHandler>, TcpStream) {
        let (app, client) = tcp_pair().await;
        let (target, far) = tcp_pair().await;
        let handler = Arc::new(ConnectionHandler::new(client, target, role, table));
        (app, handler, far)
    }

    #[tokio::test]
    async fn test_local_forward_encodes_multi_chunk_payload() {
        let table = Arc::new(CipherTable::generate());
        let (mut app, handler, mut far) = setup(Role::Local, table.clone()).await;
        let relay = tokio::spawn(handler.clone().transfer_data());

        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        app.write_all(&payload).await.unwrap();

        let mut received = vec![0u8; payload.len()];
        far.read_exact(&mut received).await.unwrap();
        assert_eq!(received, table.encode(&payload));

        drop(app);
        let stats = tokio::time::timeout(Duration::from_secs(2), relay)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.forward_bytes, payload.len() as u64);
        assert!(handler.is_closed());
    }

    #[tokio::test]
    async fn test_local_backward_decodes() {
        let table = Arc::new(CipherTable::generate());
        let (mut app, handler, mut far) = setup(Role::Local, table.clone()).await;
        let relay = tokio::spawn(handler.clone().transfer_data());

        far.write_all(&table.encode(b"HTTP/1.1 200 OK\r\n")).await.unwrap();

        let mut received = [0u8; 17];
        app.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"HTTP/1.1 200 OK\r\n");

        drop(far);
        tokio::time::timeout(Duration::from_secs(2), relay)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_remote_forward_decodes_and_backward_encodes() {
        let table = Arc::new(CipherTable::generate());
        let (mut tunnel, handler, mut target) = setup(Role::Remote, table.clone()).await;
        let relay = tokio::spawn(handler.clone().transfer_data());

        tunnel.write_all(&table.encode(b"request")).await.unwrap();
        let mut buf = [0u8; 7];
        target.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"request");

        target.write_all(b"reply").await.unwrap();
        let mut buf = [0u8; 5];
        tunnel.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf.to_vec(), table.encode(b"reply"));

        drop(target);
        let stats = tokio::time::timeout(Duration::from_secs(2), relay)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.forward_bytes, 7);
        assert_eq!(stats.backward_bytes, 5);
    }

    #[tokio::test]
    async fn test_abort_closes_both_sides() {
        let table = Arc::new(CipherTable::generate());
        let (mut app, handler, mut far) = setup(Role::Local, table).await;
        let relay = tokio::spawn(handler.clone().transfer_data());

        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.abort();
        handler.abort();

        let mut buf = [0u8; 8];
        let n = tokio::time::timeout(Duration::from_secs(1), app.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
        let n = tokio::time::timeout(Duration::from_secs(1), far.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);

        tokio::time::timeout(Duration::from_secs(2), relay)
            .await
            .unwrap()
            .unwrap();
        assert!(handler.is_closed());
    }

    #[tokio::test]
    async fn test_one_side_closing_ends_the_handler() {
        let table = Arc::new(CipherTable::generate());
        let (app, handler, _far) = setup(Role::Remote, table).await;
        let relay = tokio::spawn(handler.clone().transfer_data());

        // The target end stays open and silent.
        drop(app);
        let stats = tokio::time::timeout(Duration::from_secs(2), relay)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats, RelayStats::default());
    }
}
