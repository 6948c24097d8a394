// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session keep-alive loop
//!
//! Renews a session at half its TTL until stopped. Transient renewal failures
//! are retried on a short fixed interval; the loop only gives up when the
//! service reports the session gone or no renewal has succeeded for a full
//! TTL. When stopped it destroys the session, since nothing needs it anymore.

use crate::CoordinationError;
use kvlock_adapters::{SessionError, SessionService};
use kvlock_core::constants::SESSION_RENEW_RETRY_INTERVAL;
use kvlock_core::SessionId;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Keep `id` alive until `stop` is cancelled
///
/// Returns `Ok(())` once stopped (after a best-effort destroy) and
/// [`CoordinationError::SessionExpired`] if the session was lost.
pub async fn renew_periodic<S: SessionService>(
    sessions: &S,
    id: &SessionId,
    initial_ttl: Duration,
    stop: &CancellationToken,
) -> Result<(), CoordinationError> {
    let mut ttl = initial_ttl;
    let mut last_renewed = Instant::now();
    let mut wait = ttl / 2;

    loop {
        let renewed = tokio::select! {
            _ = stop.cancelled() => break,
            renewed = async {
                tokio::time::sleep(wait).await;
                sessions.renew(id).await
            } => renewed,
        };

        match renewed {
            Ok(granted) => {
                // A zero TTL means the service did not report one
                if !granted.is_zero() {
                    ttl = granted;
                }
                last_renewed = Instant::now();
                wait = ttl / 2;
                tracing::trace!(session = %id, ttl = ?ttl, "session renewed");
            }
            Err(SessionError::Expired(_)) => {
                tracing::warn!(session = %id, "session expired");
                return Err(CoordinationError::SessionExpired(id.clone()));
            }
            Err(e) => {
                if last_renewed.elapsed() > ttl {
                    tracing::warn!(session = %id, error = %e, "no successful renewal within ttl");
                    return Err(CoordinationError::SessionExpired(id.clone()));
                }
                tracing::warn!(session = %id, error = %e, "session renewal failed, retrying");
                wait = SESSION_RENEW_RETRY_INTERVAL;
            }
        }
    }

    if let Err(e) = sessions.destroy(id).await {
        tracing::warn!(session = %id, error = %e, "failed to destroy session");
    }
    Ok(())
}

/// Keep-alive loop running on its own task for one acquisition
pub(crate) struct KeepAlive {
    stop: CancellationToken,
    handle: JoinHandle<Result<(), CoordinationError>>,
}

impl KeepAlive {
    /// Spawn a renewal loop that stops with `lost` and cancels it on failure
    pub fn spawn<S: SessionService>(
        sessions: S,
        id: SessionId,
        ttl: Duration,
        lost: &CancellationToken,
    ) -> Self {
        let stop = lost.child_token();
        let task_stop = stop.clone();
        let lost = lost.clone();
        let handle = tokio::spawn(async move {
            let result = renew_periodic(&sessions, &id, ttl, &task_stop).await;
            if result.is_err() {
                lost.cancel();
            }
            result
        });
        Self { stop, handle }
    }

    /// Stop the loop and wait for it, returning how it ended
    pub async fn stop(self) -> Result<(), CoordinationError> {
        self.stop.cancel();
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "keep-alive task did not finish cleanly");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "keepalive_tests.rs"]
mod tests;
