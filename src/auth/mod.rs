//! Client authentication
//!
//! Credentials never cross the wire in the clear: both sides exchange
//! salted SHA-512 digests, and the relay's credential file stores the same
//! digests.

mod credentials;
mod digest;

pub use credentials::CredentialStore;
pub use digest::{encode_password, encode_username, to_field};
