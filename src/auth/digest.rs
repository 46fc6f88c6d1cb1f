//! Credential digests
//!
//! A digest is the uppercase hex SHA-512 of the value wrapped in two fixed
//! salts. Usernames and passwords use different salts.

use crate::protocol::CREDENTIAL_FIELD_LEN;
use sha2::{Digest, Sha512};
use std::fmt::Write;

const USERNAME_SALTS: (&str, &str) = ("Bdho", "X643");
const PASSWORD_SALTS: (&str, &str) = ("dlrC", "Ofsc");

/// Digest of a username as sent during sign-in
///
/// # Example
///
/// ```
/// use subrelay::auth::encode_username;
///
/// let digest = encode_username("alice");
/// assert_eq!(digest.len(), 128);
/// ```
pub fn encode_username(username: &str) -> String {
    salted_hex(username, USERNAME_SALTS)
}

/// Digest of a password as sent during sign-in
pub fn encode_password(password: &str) -> String {
    salted_hex(password, PASSWORD_SALTS)
}

/// Lay a digest out as a fixed 128-byte wire field, zero padded or truncated
pub fn to_field(digest: &str) -> [u8; CREDENTIAL_FIELD_LEN] {
    let mut field = [0u8; CREDENTIAL_FIELD_LEN];
    let bytes = digest.as_bytes();
    let n = bytes.len().min(CREDENTIAL_FIELD_LEN);
    field[..n].copy_from_slice(&bytes[..n]);
    field
}

fn salted_hex(value: &str, (prefix, suffix): (&str, &str)) -> String {
    let hash = Sha512::new()
        .chain_update(prefix.as_bytes())
        .chain_update(value.as_bytes())
        .chain_update(suffix.as_bytes())
        .finalize();

    hash.iter().fold(String::with_capacity(hash.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02X}", b);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_shape() {
        let digest = encode_username("alice");
        assert_eq!(digest.len(), 128);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_digest_matches_plain_sha512_of_salted_input() {
        let expected = Sha512::digest(b"BdhoaliceX643");
        let expected_hex: String = expected.iter().map(|b| format!("{:02X}", b)).collect();
        assert_eq!(encode_username("alice"), expected_hex);
    }

    #[test]
    fn test_username_and_password_salts_differ() {
        assert_ne!(encode_username("alice"), encode_password("alice"));
    }

    #[test]
    fn test_digest_deterministic() {
        assert_eq!(encode_password("secret"), encode_password("secret"));
        assert_ne!(encode_password("secret"), encode_password("Secret"));
    }

    #[test]
    fn test_to_field_exact() {
        let digest = encode_username("alice");
        let field = to_field(&digest);
        assert_eq!(&field[..], digest.as_bytes());
    }

    #[test]
    fn test_to_field_pads_and_truncates() {
        let field = to_field("ABC");
        assert_eq!(&field[..3], b"ABC");
        assert!(field[3..].iter().all(|&b| b == 0));

        let long = "F".repeat(200);
        let field = to_field(&long);
        assert!(field.iter().all(|&b| b == b'F'));
    }
}
