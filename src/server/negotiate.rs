//! SOCKS5 CONNECT negotiation over the obfuscated channel
//!
//! Every byte read here is decoded through the session table on receipt and
//! every reply encoded before it is sent.
//!
//! ```text
//! client                                   relay
//!   | VER NMETHODS METHODS...     ------->   |
//!   |                            <-------    | 05 00
//!   | VER CMD RSV ATYP ADDR PORT  ------->   |
//!   |                                        | resolve + dial
//!   |                            <-------    | 05 00 00 01 00*6
//! ```

use crate::cipher::CipherTable;
use crate::error::{Result, Socks5Error};
use crate::helper::{read_decoded, write_encoded};
use crate::protocol::{
    CONNECT_REPLY, METHOD_REPLY, REQUEST_HEADER_LEN, SOCKS5_ADDR_TYPE_DOMAIN,
    SOCKS5_ADDR_TYPE_IPV4, SOCKS5_ADDR_TYPE_IPV6, SOCKS5_CMD_TCP_CONNECT, SOCKS5_VERSION,
};
use tokio::io::{AsyncRead, AsyncWrite};

/// Run the method exchange and read one CONNECT request.
///
/// Returns the whole decoded request, header included, laid out as
/// `VER CMD RSV ATYP DST.ADDR DST.PORT`.
pub async fn read_request<S>(stream: &mut S, table: &CipherTable) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let greeting = read_decoded(stream, 2, table).await?;
    if greeting[0] != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(greeting[0]).into());
    }
    // Methods are listed but only "no authentication" is ever offered back.
    read_decoded(stream, greeting[1] as usize, table).await?;

    write_encoded(stream, &METHOD_REPLY, table).await?;

    let mut request = read_decoded(stream, REQUEST_HEADER_LEN, table).await?;
    if request[1] != SOCKS5_CMD_TCP_CONNECT {
        return Err(Socks5Error::CommandNotSupported(request[1]).into());
    }

    match request[3] {
        SOCKS5_ADDR_TYPE_IPV4 => {
            request.extend(read_decoded(stream, 4 + 2, table).await?);
        }
        SOCKS5_ADDR_TYPE_DOMAIN => {
            let len = read_decoded(stream, 1, table).await?;
            request.extend_from_slice(&len);
            request.extend(read_decoded(stream, len[0] as usize + 2, table).await?);
        }
        SOCKS5_ADDR_TYPE_IPV6 => {
            request.extend(read_decoded(stream, 16 + 2, table).await?);
        }
        other => return Err(Socks5Error::AddressTypeNotSupported(other).into()),
    }

    Ok(request)
}

/// Send the templated "succeeded" reply
pub async fn send_connect_reply<S>(stream: &mut S, table: &CipherTable) -> Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    write_encoded(stream, &CONNECT_REPLY, table).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TunnelError;
    use crate::protocol::TargetAddr;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_test::io::Builder;

    fn table() -> CipherTable {
        CipherTable::generate_with(&mut StdRng::seed_from_u64(7))
    }

    #[tokio::test]
    async fn test_ipv4_request() {
        let t = table();
        let request = [5, 1, 0, 1, 93, 184, 216, 34, 0x00, 0x50];
        let mut stream = Builder::new()
            .read(&t.encode(&[5, 2]))
            .read(&t.encode(&[0, 2]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&request))
            .build();

        let decoded = read_request(&mut stream, &t).await.unwrap();
        assert_eq!(decoded, request);
        assert_eq!(
            TargetAddr::from_request(&decoded).unwrap(),
            TargetAddr::Ip("93.184.216.34:80".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_domain_request() {
        let t = table();
        let mut request = vec![5, 1, 0, 3, 11];
        request.extend_from_slice(b"example.com");
        request.extend_from_slice(&[0x01, 0xBB]);

        let mut stream = Builder::new()
            .read(&t.encode(&[5, 1, 0]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&request[..4]))
            .read(&t.encode(&request[4..5]))
            .read(&t.encode(&request[5..]))
            .build();

        let decoded = read_request(&mut stream, &t).await.unwrap();
        assert_eq!(decoded, request);
        assert_eq!(
            TargetAddr::from_request(&decoded).unwrap(),
            TargetAddr::Domain("example.com".to_string(), 443)
        );
    }

    #[tokio::test]
    async fn test_ipv6_request() {
        let t = table();
        let mut request = vec![5, 1, 0, 4];
        request.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        request.extend_from_slice(&[0u8; 11]);
        request.push(1);
        request.extend_from_slice(&[0x00, 0x50]);

        let mut stream = Builder::new()
            .read(&t.encode(&[5, 1, 0]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&request))
            .build();

        let decoded = read_request(&mut stream, &t).await.unwrap();
        assert_eq!(decoded.len(), 22);
        assert_eq!(
            TargetAddr::from_request(&decoded).unwrap(),
            TargetAddr::Ip("[2001:db8::1]:80".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let t = table();
        let mut stream = Builder::new().read(&t.encode(&[4, 1])).build();

        let err = read_request(&mut stream, &t).await.unwrap_err();
        assert!(matches!(
            err,
            TunnelError::Socks5(Socks5Error::UnsupportedVersion(4))
        ));
    }

    #[tokio::test]
    async fn test_bind_command_rejected() {
        let t = table();
        let mut stream = Builder::new()
            .read(&t.encode(&[5, 1, 0]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&[5, 2, 0, 1]))
            .build();

        let err = read_request(&mut stream, &t).await.unwrap_err();
        assert!(matches!(
            err,
            TunnelError::Socks5(Socks5Error::CommandNotSupported(2))
        ));
    }

    #[tokio::test]
    async fn test_unknown_address_type_rejected() {
        let t = table();
        let mut stream = Builder::new()
            .read(&t.encode(&[5, 1, 0]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&[5, 1, 0, 9]))
            .build();

        let err = read_request(&mut stream, &t).await.unwrap_err();
        assert!(matches!(
            err,
            TunnelError::Socks5(Socks5Error::AddressTypeNotSupported(9))
        ));
    }

    #[tokio::test]
    async fn test_truncated_request_is_transport_failure() {
        let t = table();
        let mut stream = Builder::new()
            .read(&t.encode(&[5, 1, 0]))
            .write(&t.encode(&METHOD_REPLY))
            .read(&t.encode(&[5, 1, 0, 1, 93, 184]))
            .build();

        let err = read_request(&mut stream, &t).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connect_reply() {
        let t = table();
        let mut stream = Builder::new().write(&t.encode(&CONNECT_REPLY)).build();
        send_connect_reply(&mut stream, &t).await.unwrap();
    }
}
