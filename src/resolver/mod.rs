//! Address resolution and socket tuning
//!
//! [`AddressResolver`] fixes the role of this process and turns decoded
//! CONNECT requests into dialable endpoints. [`SocketOpts`] applies TCP
//! options to every tunnel socket.

mod address;
mod socket;

pub use address::AddressResolver;
pub use socket::SocketOpts;
