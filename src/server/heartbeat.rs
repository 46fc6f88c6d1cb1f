//! Heartbeat monitor

use crate::config::ServerConfig;
use crate::error::TunnelError;
use crate::helper::{duration_from_secs, read_array};
use crate::protocol::{BEAT, HEARTBEAT_INTERVAL_SECS, HEARTBEAT_TIMEOUT_SECS};
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::debug;

/// Heartbeat timing on the receiving side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSettings {
    /// Sleep between two reads
    pub interval: Duration,
    /// Deadline for each read
    pub timeout: Duration,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        HeartbeatSettings {
            interval: duration_from_secs(HEARTBEAT_INTERVAL_SECS),
            timeout: duration_from_secs(HEARTBEAT_TIMEOUT_SECS),
        }
    }
}

impl HeartbeatSettings {
    /// Settings from the relay configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        HeartbeatSettings {
            interval: duration_from_secs(config.heartbeat_interval_secs),
            timeout: duration_from_secs(config.heartbeat_timeout_secs),
        }
    }
}

/// Watch the control stream until the peer stops beating.
///
/// Each cycle reads exactly one BEAT marker within `settings.timeout`, then
/// sleeps `settings.interval`. Returns the failure that ended the loop.
pub async fn monitor<S>(stream: &mut S, settings: HeartbeatSettings) -> TunnelError
where
    S: AsyncRead + Unpin + ?Sized,
{
    loop {
        match tokio::time::timeout(settings.timeout, read_array::<3, _>(stream)).await {
            Ok(Ok(beat)) if beat == BEAT => debug!("Received heartbeat"),
            Ok(Ok(other)) => {
                return TunnelError::Heartbeat(format!("unexpected marker {:02X?}", other))
            }
            Ok(Err(e)) => return TunnelError::Io(e),
            Err(_) => {
                return TunnelError::Heartbeat(format!(
                    "no heartbeat within {:?}",
                    settings.timeout
                ))
            }
        }

        tokio::time::sleep(settings.interval).await;
    }
}
