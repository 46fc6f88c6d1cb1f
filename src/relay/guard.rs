//! Close-once socket guard
//!
//! Both relay directions and an external abort may race to close the same
//! socket. The guard lets exactly one of them through; closing also wakes
//! any task blocked on the socket.

use std::io;
use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// One-shot latch guarding a close action
#[derive(Debug, Default)]
pub struct CloseOnce {
    closed: AtomicBool,
}

impl CloseOnce {
    /// Create an open latch
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the latch has fired
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Run `close` if no caller has done so yet. Returns whether it ran.
    pub fn close_with<F: FnOnce()>(&self, close: F) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            close();
            true
        } else {
            false
        }
    }
}

/// A TCP socket shared between relay tasks, closable exactly once
#[derive(Debug)]
pub struct SocketGuard {
    stream: TcpStream,
    once: CloseOnce,
    closed: CancellationToken,
}

impl SocketGuard {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Self {
        SocketGuard {
            stream,
            once: CloseOnce::new(),
            closed: CancellationToken::new(),
        }
    }

    /// Whether the socket has been closed
    pub fn is_closed(&self) -> bool {
        self.once.is_closed()
    }

    /// Shut the socket down in both directions.
    ///
    /// Returns `true` for the call that actually closed it; later and
    /// concurrent calls are no-ops returning `false`.
    pub fn close(&self) -> bool {
        self.once.close_with(|| {
            // The peer may already be gone; the socket is dead either way.
            if let Err(e) = socket2::SockRef::from(&self.stream).shutdown(Shutdown::Both) {
                tracing::debug!("Shutdown after peer close: {}", e);
            }
            self.closed.cancel();
        })
    }

    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed cleanly.
    pub async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => return Err(closed_error()),
                ready = self.stream.readable() => ready?,
            }

            match self.stream.try_read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Write all of `buf`, retrying partial writes
    pub async fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => return Err(closed_error()),
                ready = self.stream.writable() => ready?,
            }

            match self.stream.try_write(buf) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket closed")
}
