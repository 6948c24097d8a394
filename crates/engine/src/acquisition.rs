// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-acquisition state shared by locks and semaphores
//!
//! Each acquisition owns one `lost` token. Starting an acquisition replaces
//! it (cancelling the previous one), and cancelling it stops both background
//! loops: the session keep-alive and the ownership monitor. Background tasks
//! capture the token at spawn, never the slot it lives in.

use crate::keepalive::KeepAlive;
use crate::monitor::MonitorOutcome;
use crate::CoordinationError;
use kvlock_adapters::SessionService;
use kvlock_core::{QueryOptions, SessionId, SessionPolicy};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct MonitorTask {
    stop: CancellationToken,
    handle: JoinHandle<Result<MonitorOutcome, CoordinationError>>,
}

pub(crate) struct Acquisition {
    lost: CancellationToken,
    session: Option<SessionId>,
    keepalive: Option<KeepAlive>,
    monitor: Option<MonitorTask>,
}

impl Acquisition {
    pub fn new() -> Self {
        Self {
            lost: CancellationToken::new(),
            session: None,
            keepalive: None,
            monitor: None,
        }
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Signal handed to the caller; fires when ownership ends
    pub fn lost_signal(&self) -> CancellationToken {
        self.lost.child_token()
    }

    /// Install a fresh token for a new acquisition
    pub fn reset_token(&mut self) {
        let previous = std::mem::replace(&mut self.lost, CancellationToken::new());
        previous.cancel();
    }

    /// Use the configured session, creating (and keeping alive) one if asked
    pub async fn start_session<S: SessionService>(
        &mut self,
        sessions: &S,
        policy: &SessionPolicy,
        cancel: &CancellationToken,
    ) -> Result<SessionId, CoordinationError> {
        let id = match policy {
            SessionPolicy::Existing(id) => id.clone(),
            SessionPolicy::Create(request) => {
                let id = self.guarded(cancel, sessions.create(request)).await?;
                self.keepalive = Some(KeepAlive::spawn(
                    sessions.clone(),
                    id.clone(),
                    request.ttl,
                    &self.lost,
                ));
                id
            }
        };
        self.session = Some(id.clone());
        Ok(id)
    }

    /// Why the acquisition must stop now, if it must
    pub async fn interrupted(&mut self, cancel: &CancellationToken) -> Option<CoordinationError> {
        if cancel.is_cancelled() {
            return Some(CoordinationError::Cancelled);
        }
        if self.lost.is_cancelled() {
            return Some(self.keepalive_failure().await);
        }
        None
    }

    /// Run one store call, abandoning it if the caller cancels or the
    /// session is lost
    pub async fn guarded<T, E, F>(
        &mut self,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, CoordinationError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<CoordinationError>,
    {
        let lost = self.lost.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CoordinationError::Cancelled),
            _ = lost.cancelled() => Err(self.keepalive_failure().await),
            result = call => result.map_err(Into::into),
        }
    }

    /// Sleep for `delay` unless interrupted first
    pub async fn pause(
        &mut self,
        cancel: &CancellationToken,
        delay: Duration,
    ) -> Result<(), CoordinationError> {
        self.guarded(cancel, async {
            tokio::time::sleep(delay).await;
            Ok::<(), CoordinationError>(())
        })
        .await
    }

    /// The keep-alive's failure, once the lost token fired during acquire
    async fn keepalive_failure(&mut self) -> CoordinationError {
        match self.keepalive.take() {
            Some(keepalive) => match keepalive.stop().await {
                Err(e) => e,
                Ok(()) => CoordinationError::Cancelled,
            },
            None => CoordinationError::Cancelled,
        }
    }

    /// Spawn the ownership monitor; loss clears `held` and fires the lost token
    pub fn spawn_monitor<F, Fut>(&mut self, held: Arc<AtomicBool>, watch: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<MonitorOutcome, CoordinationError>> + Send + 'static,
    {
        let stop = self.lost.child_token();
        let lost = self.lost.clone();
        let watching = watch(stop.clone());
        let handle = tokio::spawn(async move {
            let result = watching.await;
            // Stopped by the lost token (keep-alive failure) rather than by release
            let stopped_by_loss = lost.is_cancelled();
            if stopped_by_loss || !matches!(result, Ok(MonitorOutcome::Stopped)) {
                held.store(false, Ordering::SeqCst);
                lost.cancel();
            }
            result
        });
        self.monitor = Some(MonitorTask { stop, handle });
    }

    /// Stop the monitor and wait for it to exit
    pub async fn stop_monitor(&mut self) {
        let Some(monitor) = self.monitor.take() else {
            return;
        };
        monitor.stop.cancel();
        match monitor.handle.await {
            Ok(Err(e)) => tracing::debug!(error = %e, "monitor had already failed"),
            Ok(Ok(_)) => {}
            Err(e) => tracing::warn!(error = %e, "monitor task did not finish cleanly"),
        }
    }

    /// Cancel and join every background loop, then forget the session
    ///
    /// Errors from the loops are logged and swallowed.
    pub async fn teardown(&mut self) {
        self.stop_monitor().await;
        self.lost.cancel();
        if let Some(keepalive) = self.keepalive.take() {
            if let Err(e) = keepalive.stop().await {
                tracing::warn!(error = %e, "keep-alive ended with an error");
            }
        }
        self.session = None;
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        // Detached loops exit on their own once the token fires
        self.lost.cancel();
    }
}

/// Time accounting for try-once acquisition
///
/// Without try-once every read may block for the full wait time. With it, the
/// total time is bounded by one wait time: each read blocks at most for what
/// remains, and once nothing remains one last non-blocking read is made.
pub(crate) struct AttemptBudget {
    try_once: bool,
    wait_time: Duration,
    started: Instant,
    exhausted: bool,
}

impl AttemptBudget {
    pub fn new(try_once: bool, wait_time: Duration) -> Self {
        Self {
            try_once,
            wait_time,
            started: Instant::now(),
            exhausted: false,
        }
    }

    /// Prepare `query` for the next attempt, or fail if the budget is spent
    pub fn next(&mut self, query: &mut QueryOptions) -> Result<(), CoordinationError> {
        if !self.try_once {
            return Ok(());
        }
        let elapsed = self.started.elapsed();
        if self.exhausted || elapsed > self.wait_time {
            return Err(CoordinationError::MaxAttemptsReached { elapsed });
        }
        let remaining = self.wait_time - elapsed;
        if remaining.is_zero() {
            self.exhausted = true;
            query.wait_index = 0;
        } else {
            query.wait_time = remaining;
        }
        Ok(())
    }

    /// Bound a retry sleep by what remains of the budget
    pub fn clamp(&self, delay: Duration) -> Duration {
        if self.try_once {
            delay.min(self.wait_time.saturating_sub(self.started.elapsed()))
        } else {
            delay
        }
    }
}

#[cfg(test)]
#[path = "acquisition_tests.rs"]
mod tests;
