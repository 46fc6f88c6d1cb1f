//! Protocol constants
//!
//! Sentinels and field sizes of the credential handshake, cipher exchange
//! and heartbeat, plus the SOCKS5 subset understood by request negotiation.

/// Length of each credential digest field on the wire
pub const CREDENTIAL_FIELD_LEN: usize = 128;

/// Length of the sign-in verdict
pub const VERDICT_LEN: usize = 3;

/// Verdict sent when the credentials match
pub const SUCCESS: [u8; VERDICT_LEN] = [0x01, 0x02, 0x03];

/// Verdict sent when the credentials do not match
pub const FAIL: [u8; VERDICT_LEN] = [0x03, 0x02, 0x01];

/// Heartbeat marker
pub const BEAT: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Seconds between heartbeats sent by the local side
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Read deadline, in seconds, the relay applies to each heartbeat
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 1;

/// Maximum bytes moved per relay read
pub const RELAY_CHUNK_SIZE: usize = 256;

/// Default relay listen port
pub const DEFAULT_RELAY_PORT: u16 = 6204;

// SOCKS5 subset
/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// Reserved byte value
pub const SOCKS5_RESERVED: u8 = 0x00;
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;
/// Succeeded
pub const SOCKS5_REPLY_SUCCEEDED: u8 = 0x00;

/// Method selection reply: version 5, no authentication
pub const METHOD_REPLY: [u8; 2] = [SOCKS5_VERSION, SOCKS5_AUTH_METHOD_NONE];

/// Templated CONNECT success reply. The bound address is always zero.
pub const CONNECT_REPLY: [u8; 10] = [
    SOCKS5_VERSION,
    SOCKS5_REPLY_SUCCEEDED,
    SOCKS5_RESERVED,
    SOCKS5_ADDR_TYPE_IPV4,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
    0x00,
];

/// Length of the fixed request header (VER, CMD, RSV, ATYP)
pub const REQUEST_HEADER_LEN: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(SUCCESS, [1, 2, 3]);
        assert_eq!(FAIL, [3, 2, 1]);
        assert_eq!(BEAT, [0xFF; 3]);
        assert_ne!(SUCCESS, FAIL);
    }

    #[test]
    fn test_field_sizes() {
        assert_eq!(CREDENTIAL_FIELD_LEN, 128);
        assert_eq!(RELAY_CHUNK_SIZE, 256);
    }

    #[test]
    fn test_heartbeat_constants() {
        assert_eq!(HEARTBEAT_INTERVAL_SECS, 5);
        assert_eq!(HEARTBEAT_TIMEOUT_SECS, 1);
    }

    #[test]
    fn test_replies() {
        assert_eq!(METHOD_REPLY, [0x05, 0x00]);
        assert_eq!(CONNECT_REPLY, [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]);
    }
}
