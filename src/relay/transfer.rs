//! One relay direction

use super::guard::SocketGuard;
use crate::cipher::{CipherTable, Transform};
use crate::protocol::RELAY_CHUNK_SIZE;
use tracing::debug;

/// Copy from `src` to `dst` until `src` closes or either side fails.
///
/// Reads at most [`RELAY_CHUNK_SIZE`] bytes at a time, applies `transform`
/// to exactly the bytes read and writes all of them before reading again.
/// Returns the number of bytes forwarded.
pub async fn transfer(
    src: &SocketGuard,
    dst: &SocketGuard,
    table: &CipherTable,
    transform: Transform,
) -> u64 {
    let mut buf = [0u8; RELAY_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = match src.read(&mut buf).await {
            Ok(0) => {
                debug!("Connection closed by peer after {} bytes", total);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!("Read error after {} bytes: {}", total, e);
                break;
            }
        };

        let chunk = &mut buf[..n];
        transform.apply(table, chunk);

        if let Err(e) = dst.write_all(chunk).await {
            debug!("Write error after {} bytes: {}", total, e);
            break;
        }
        total += n as u64;
    }

    total
}
