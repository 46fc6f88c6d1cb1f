//! Tunnel wire protocol
//!
//! Constants and types shared by both sides of the tunnel:
//!
//! 1. credential handshake (two 128-byte digest fields, 3-byte verdict)
//! 2. cipher exchange (256-byte encode table, 256-byte decode table)
//! 3. heartbeat (3-byte BEAT marker, repeating)
//! 4. per-request SOCKS5 CONNECT negotiation, carried through the cipher

mod consts;
mod types;

pub use consts::*;
pub use types::{Direction, Role, TargetAddr};
