//! Protocol type definitions
//!
//! Tunnel side and relay direction tags, and the destination address
//! carried in a CONNECT request.

use super::consts::*;
use crate::error::{Result, Socks5Error, TunnelError};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Which side of the tunnel a process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Application-facing forwarder
    Local,
    /// Target-facing relay
    Remote,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Local => write!(f, "local"),
            Role::Remote => write!(f, "remote"),
        }
    }
}

/// Direction of one relay task within a connection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client socket to target socket
    Forward,
    /// Target socket to client socket
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Destination address of a CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Parse a fully decoded request.
    ///
    /// ```text
    /// +----+-----+-------+------+----------+----------+
    /// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    /// +----+-----+-------+------+----------+----------+
    /// | 1  |  1  | X'00' |  1   | Variable |    2     |
    /// +----+-----+-------+------+----------+----------+
    /// ```
    ///
    /// For a domain name, DST.ADDR starts with its one-byte length. The port
    /// is always the last two bytes, big-endian.
    pub fn from_request(request: &[u8]) -> std::result::Result<Self, Socks5Error> {
        if request.len() < REQUEST_HEADER_LEN + 2 {
            return Err(Socks5Error::InvalidAddress(format!(
                "request too short: {} bytes",
                request.len()
            )));
        }

        let len = request.len();
        let port = u16::from_be_bytes([request[len - 2], request[len - 1]]);
        let addr = &request[REQUEST_HEADER_LEN..len - 2];

        match request[3] {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let octets: [u8; 4] = addr.try_into().map_err(|_| {
                    Socks5Error::InvalidAddress(format!("IPv4 address of {} bytes", addr.len()))
                })?;
                Ok(TargetAddr::ipv4(Ipv4Addr::from(octets), port))
            }
            SOCKS5_ADDR_TYPE_IPV6 => {
                let octets: [u8; 16] = addr.try_into().map_err(|_| {
                    Socks5Error::InvalidAddress(format!("IPv6 address of {} bytes", addr.len()))
                })?;
                Ok(TargetAddr::ipv6(Ipv6Addr::from(octets), port))
            }
            SOCKS5_ADDR_TYPE_DOMAIN => {
                let (name_len, name) = addr
                    .split_first()
                    .ok_or_else(|| Socks5Error::InvalidDomain(String::new()))?;
                if *name_len as usize != name.len() || name.is_empty() {
                    return Err(Socks5Error::InvalidDomain(format!(
                        "length byte {} for {} name bytes",
                        name_len,
                        name.len()
                    )));
                }
                let domain = String::from_utf8(name.to_vec())
                    .map_err(|_| Socks5Error::InvalidDomain("non UTF-8 name".to_string()))?;
                Ok(TargetAddr::domain(domain, port))
            }
            other => Err(Socks5Error::AddressTypeNotSupported(other)),
        }
    }

    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: String, port: u16) -> Self {
        TargetAddr::Domain(domain, port)
    }

    /// Resolve the address to a SocketAddr
    ///
    /// For IP addresses, this returns immediately.
    /// For domain names, this asks the system resolver.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            TargetAddr::Ip(addr) => Ok(*addr),
            TargetAddr::Domain(domain, port) => tokio::net::lookup_host((domain.as_str(), *port))
                .await
                .map_err(|e| TunnelError::Resolve(format!("{}: {}", domain, e)))?
                .next()
                .ok_or_else(|| TunnelError::Resolve(format!("no addresses for {}", domain))),
        }
    }

    /// Serialize as ATYP, DST.ADDR, DST.PORT.
    ///
    /// Fails for a domain name that does not fit its one-byte length field.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, Socks5Error> {
        let mut bytes = Vec::new();

        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV4);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV6);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Domain(domain, port) => {
                let len = u8::try_from(domain.len()).map_err(|_| {
                    Socks5Error::InvalidDomain(format!("name of {} bytes", domain.len()))
                })?;
                bytes.push(SOCKS5_ADDR_TYPE_DOMAIN);
                bytes.push(len);
                bytes.extend_from_slice(domain.as_bytes());
                bytes.extend_from_slice(&port.to_be_bytes());
            }
        }

        Ok(bytes)
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}
