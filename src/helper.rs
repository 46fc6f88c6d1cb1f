//! Helper utilities for Subrelay
//!
//! Fixed-size field IO used by every handshake stage. Each helper transfers
//! exactly the requested number of bytes or fails; a peer closing early
//! surfaces as `UnexpectedEof`, never as a short field.

use crate::cipher::CipherTable;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read exactly `N` bytes into an array
pub async fn read_array<const N: usize, S>(stream: &mut S) -> io::Result<[u8; N]>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; N];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read exactly `len` bytes
pub async fn read_field<S>(stream: &mut S, len: usize) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read exactly `len` bytes and decode them through `table`
pub async fn read_decoded<S>(stream: &mut S, len: usize, table: &CipherTable) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut buf = read_field(stream, len).await?;
    table.decode_in_place(&mut buf);
    Ok(buf)
}

/// Write all of `data` and flush
pub async fn write_field<S>(stream: &mut S, data: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(data).await?;
    stream.flush().await
}

/// Encode `data` through `table`, then write all of it and flush
pub async fn write_encoded<S>(stream: &mut S, data: &[u8], table: &CipherTable) -> io::Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    write_field(stream, &table.encode(data)).await
}

/// Parse duration from seconds
pub fn duration_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}
