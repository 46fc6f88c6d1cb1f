//! Heartbeat sender

use crate::error::Result;
use crate::helper::write_field;
use crate::protocol::BEAT;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::debug;

/// Write a BEAT marker every `interval`, forever.
///
/// Only returns when a write fails, which means the relay is gone.
pub async fn send_heartbeats<S>(stream: &mut S, interval: Duration) -> Result<()>
where
    S: AsyncWrite + Unpin + ?Sized,
{
    loop {
        write_field(stream, &BEAT).await?;
        debug!("Sent heartbeat");
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_beats_repeat() {
        let (mut tx, mut rx) = duplex(64);
        let sender = tokio::spawn(async move {
            send_heartbeats(&mut tx, Duration::from_millis(5)).await
        });

        let mut buf = [0u8; 9];
        rx.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0xFF; 9]);

        drop(rx);
        let result = tokio::time::timeout(Duration::from_secs(1), sender)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_err());
    }
}
