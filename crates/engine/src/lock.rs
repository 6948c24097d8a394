// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutual-exclusion lock
//!
//! The lock is one KV entry tagged with the lock flag. A session owns the
//! lock when the store reports it as the entry's owner; the store's
//! acquire-by-session write is the only arbiter between participants.

use crate::acquisition::{Acquisition, AttemptBudget};
use crate::monitor::{watch_lock, MonitorPolicy};
use crate::mutex::CoordinationMutex;
use crate::CoordinationError;
use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::{lock_entry, KvEntry, LockObservation, LockOptions, QueryOptions, SessionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A lock on a single key
pub struct Lock<K, S> {
    kv: K,
    sessions: S,
    opts: LockOptions,
    held: Arc<AtomicBool>,
    state: CoordinationMutex<Acquisition>,
}

impl<K: KvStore, S: SessionService> Lock<K, S> {
    /// Create a lock after validating `opts`
    pub fn new(kv: K, sessions: S, opts: LockOptions) -> Result<Self, CoordinationError> {
        opts.validate()?;
        Ok(Self {
            kv,
            sessions,
            opts,
            held: Arc::new(AtomicBool::new(false)),
            state: CoordinationMutex::new(Acquisition::new()),
        })
    }

    pub fn key(&self) -> &str {
        &self.opts.key
    }

    pub fn options(&self) -> &LockOptions {
        &self.opts
    }

    /// Whether this instance currently believes it holds the lock
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Acquire the lock, waiting for the current holder if there is one
    ///
    /// Returns a token that is cancelled as soon as the lock is lost or
    /// released. Cancelling `cancel` abandons the attempt with
    /// [`CoordinationError::Cancelled`].
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CancellationToken, CoordinationError> {
        // A busy state means another acquisition on this instance is pending
        let Some(mut state) = self.state.try_lock() else {
            return Err(CoordinationError::Held);
        };
        if self.is_held() {
            return Err(CoordinationError::Held);
        }
        // A lost acquisition may still have loops winding down
        state.teardown().await;
        state.reset_token();

        let started = Instant::now();
        let session = match self.contend(&mut state, cancel).await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(key = %self.opts.key, error = %e, "lock acquisition failed");
                state.teardown().await;
                return Err(e);
            }
        };

        self.held.store(true, Ordering::SeqCst);
        let kv = self.kv.clone();
        let key = self.opts.key.clone();
        let watched = session.clone();
        let policy = self.monitor_policy();
        state.spawn_monitor(Arc::clone(&self.held), move |stop| {
            watch_lock(kv, key, watched, policy, stop)
        });
        tracing::info!(
            key = %self.opts.key,
            session = %session,
            elapsed = ?started.elapsed(),
            "lock acquired"
        );
        Ok(state.lost_signal())
    }

    /// Loop until this session owns the key
    async fn contend(
        &self,
        state: &mut Acquisition,
        cancel: &CancellationToken,
    ) -> Result<SessionId, CoordinationError> {
        let session = state
            .start_session(&self.sessions, &self.opts.session, cancel)
            .await?;
        let claim = lock_entry(&self.opts.key, &self.opts.value, &session);
        let mut budget = AttemptBudget::new(self.opts.try_once, self.opts.wait_time);
        let mut query = QueryOptions::blocking(self.opts.wait_time);

        loop {
            if let Some(e) = state.interrupted(cancel).await {
                return Err(e);
            }
            budget.next(&mut query)?;

            let current = state
                .guarded(cancel, self.kv.get(&self.opts.key, &query))
                .await?;
            match LockObservation::of(current.value.as_ref(), Some(&session)) {
                LockObservation::Conflict { flags } => {
                    return Err(CoordinationError::Conflict {
                        key: self.opts.key.clone(),
                        flags,
                    });
                }
                LockObservation::OwnedBySelf => return Ok(session),
                LockObservation::OwnedByOther { holder } => {
                    tracing::debug!(key = %self.opts.key, holder = %holder, "lock held, waiting");
                    query.wait_index = current.last_index;
                    continue;
                }
                LockObservation::Absent | LockObservation::Vacant { .. } => {}
            }

            if state.guarded(cancel, self.kv.acquire(&claim)).await? {
                return Ok(session);
            }

            // Claim refused: either someone raced in or a lock-delay applies
            let recheck = state
                .guarded(cancel, self.kv.get(&self.opts.key, &QueryOptions::new()))
                .await?;
            if recheck.value.as_ref().is_some_and(KvEntry::is_owned) {
                query.wait_index = recheck.last_index;
            } else {
                tracing::debug!(key = %self.opts.key, "lock delay in effect, retrying");
                query.wait_index = 0;
                state
                    .pause(cancel, budget.clamp(self.opts.retry_time))
                    .await?;
            }
        }
    }

    /// Release a held lock, keeping its value in place
    pub async fn release(&self) -> Result<(), CoordinationError> {
        let mut state = match self.state.try_lock() {
            Some(state) => state,
            // An acquisition is still pending, so nothing is held yet
            None if !self.is_held() => return Err(CoordinationError::NotHeld),
            None => self.state.lock().await,
        };
        if !self.held.swap(false, Ordering::SeqCst) {
            state.teardown().await;
            return Err(CoordinationError::NotHeld);
        }
        state.stop_monitor().await;

        let released = match state.session() {
            Some(session) => {
                let entry = lock_entry(&self.opts.key, &self.opts.value, session);
                self.kv.release(&entry).await.map_err(CoordinationError::from)
            }
            None => Ok(false),
        };
        state.teardown().await;

        if !released? {
            tracing::debug!(key = %self.opts.key, "lock was no longer owned at release");
        }
        tracing::info!(key = %self.opts.key, "lock released");
        Ok(())
    }

    /// Delete the lock key if nobody holds it
    ///
    /// An absent key is not an error.
    pub async fn destroy(&self) -> Result<(), CoordinationError> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(CoordinationError::Held);
        };
        if self.is_held() {
            return Err(CoordinationError::Held);
        }
        state.teardown().await;

        let current = self.kv.get(&self.opts.key, &QueryOptions::new()).await?;
        match LockObservation::of(current.value.as_ref(), None) {
            LockObservation::Absent => Ok(()),
            LockObservation::Conflict { flags } => Err(CoordinationError::Conflict {
                key: self.opts.key.clone(),
                flags,
            }),
            LockObservation::OwnedBySelf | LockObservation::OwnedByOther { .. } => {
                Err(CoordinationError::InUse)
            }
            LockObservation::Vacant { modify_index } => {
                let entry = KvEntry::new(&self.opts.key).with_modify_index(modify_index);
                if !self.kv.delete_cas(&entry).await? {
                    return Err(CoordinationError::InUse);
                }
                tracing::info!(key = %self.opts.key, "lock destroyed");
                Ok(())
            }
        }
    }

    fn monitor_policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            wait_time: self.opts.wait_time,
            retries: self.opts.monitor_retries,
            retry_time: self.opts.monitor_retry_time,
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
