//! Byte-substitution cipher for the proxy-to-proxy hop
//!
//! A [`CipherTable`] is a random derangement of the 256 byte values plus its
//! inverse. It defeats simple byte-pattern inspection of the tunnel; it is
//! not encryption. The table travels in the clear right after sign-in, so an
//! observer of that exchange can read the rest of the session.

mod table;

pub use table::{CipherTable, TABLE_SIZE};

use crate::protocol::{Direction, Role};

/// Per-byte transform applied by one relay direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Bytes pass through untouched
    Identity,
    /// Apply the encode table
    Encode,
    /// Apply the decode table
    Decode,
}

impl Transform {
    /// Select the transform for a relay direction on a given side of the tunnel.
    ///
    /// Each side encodes what it sends toward the other proxy and decodes
    /// what it receives from it. The local side faces the tunnel on its
    /// target socket, the remote side on its client socket.
    pub fn select(role: Role, direction: Direction) -> Self {
        match (role, direction) {
            (Role::Local, Direction::Forward) => Transform::Encode,
            (Role::Local, Direction::Backward) => Transform::Decode,
            (Role::Remote, Direction::Forward) => Transform::Decode,
            (Role::Remote, Direction::Backward) => Transform::Encode,
        }
    }

    /// Apply this transform to `buf` in place
    pub fn apply(self, table: &CipherTable, buf: &mut [u8]) {
        match self {
            Transform::Identity => {}
            Transform::Encode => table.encode_in_place(buf),
            Transform::Decode => table.decode_in_place(buf),
        }
    }
}
