//! Paired-socket relay
//!
//! A [`ConnectionHandler`] owns a client socket and a target socket and
//! runs one copy task per direction, passing bytes through the session's
//! [`CipherTable`](crate::cipher::CipherTable) on the proxy-to-proxy hop.
//! Each socket closes exactly once no matter how many paths try to close it.

mod guard;
mod handler;
mod transfer;

pub use guard::{CloseOnce, SocketGuard};
pub use handler::{ConnectionHandler, RelayStats};
pub use transfer::transfer;
