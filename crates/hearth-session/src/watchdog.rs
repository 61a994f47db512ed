// SPDX-License-Identifier: Apache-2.0
//! Keepalive watchdog.
//!
//! The peer is expected to send frequent `PingRequest`s, but server-side
//! enforcement of that cadence is otherwise unspecified. This applies a flat
//! 90-second silence timeout to every inbound read, reset on any frame (not
//! just pings) since any traffic proves the peer is alive.

use std::time::Duration;

use crate::error::SessionError;

/// How long a connection may go without receiving any frame before it's
/// considered dead.
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(90);

/// Race `read` against [`KEEPALIVE_TIMEOUT`], turning an elapsed timer into
/// [`SessionError::KeepaliveTimeout`].
///
/// # Errors
/// Returns [`SessionError::KeepaliveTimeout`] if `read` doesn't resolve in
/// time, or propagates `read`'s own error.
pub async fn with_keepalive<T, E, F>(read: F) -> Result<T, SessionError>
where
    F: std::future::Future<Output = Result<T, E>>,
    SessionError: From<E>,
{
    match tokio::time::timeout(KEEPALIVE_TIMEOUT, read).await {
        Ok(result) => result.map_err(SessionError::from),
        Err(_elapsed) => Err(SessionError::KeepaliveTimeout(KEEPALIVE_TIMEOUT)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_read_surfaces_as_keepalive_timeout() {
        let task = tokio::spawn(with_keepalive(async {
            tokio::time::sleep(Duration::from_secs(200)).await;
            Ok::<(), hearth_transport::TransportError>(())
        }));
        tokio::time::advance(KEEPALIVE_TIMEOUT + Duration::from_secs(1)).await;
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, Err(SessionError::KeepaliveTimeout(_))));
    }
}
