//! Test utilities for Subrelay
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use subrelay::auth::CredentialStore;
use subrelay::cipher::CipherTable;
use subrelay::config::ServerConfig;
use subrelay::server::{Server, SessionRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Find a loopback port that is free right now
pub async fn free_port() -> u16 {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr.port()
}

/// Spawn a target that echoes every connection back to itself
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut rd, mut wr) = stream.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });
    addr
}

/// Spawn a target that reads exactly `len` bytes from one connection,
/// replies with `reply` and hands back what it read
pub async fn spawn_capture_server(
    len: usize,
    reply: &'static [u8],
) -> (SocketAddr, tokio::sync::oneshot::Receiver<Vec<u8>>) {
    let (listener, addr) = create_test_listener().await;
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        stream.write_all(reply).await.unwrap();
        let _ = tx.send(buf);
        // Hold the connection open until the peer leaves.
        let mut rest = [0u8; 16];
        let _ = stream.read(&mut rest).await;
    });
    (addr, rx)
}

/// Credentials for alice/secret
pub fn alice_credentials() -> CredentialStore {
    let mut store = CredentialStore::new();
    store.insert_plain("alice", "secret");
    store
}

/// Relay configuration on an ephemeral loopback port
pub fn server_config(heartbeat_timeout_secs: u64) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        heartbeat_interval_secs: 0,
        heartbeat_timeout_secs,
        ..Default::default()
    }
}

/// A relay running in the background
pub struct TestRelay {
    pub addr: SocketAddr,
    pub registry: Arc<SessionRegistry>,
    pub shutdown_tx: broadcast::Sender<bool>,
}

/// Bind and run a relay
pub async fn start_relay(config: ServerConfig) -> TestRelay {
    let server = Server::bind(&config, alice_credentials()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(server.run(shutdown_rx));
    TestRelay {
        addr,
        registry,
        shutdown_tx,
    }
}

/// Open a CONNECT relay to `target` over an already signed-in session
pub async fn open_relay(relay: SocketAddr, table: &CipherTable, target: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(relay).await.unwrap();

    stream.write_all(&table.encode(&[5, 1, 0])).await.unwrap();
    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(table.decode(&reply), vec![5, 0]);

    let mut request = vec![5, 1, 0];
    request.extend_from_slice(&subrelay::protocol::TargetAddr::from(target).to_bytes().unwrap());
    stream.write_all(&table.encode(&request)).await.unwrap();

    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(table.decode(&reply), subrelay::protocol::CONNECT_REPLY.to_vec());

    stream
}

/// Wait until `check` holds, polling for up to `secs` seconds
pub async fn eventually<F: Fn() -> bool>(secs: u64, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(secs);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    check()
}
