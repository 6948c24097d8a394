// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed counting semaphore
//!
//! Each participant announces itself with a contender entry at
//! `prefix/<session>` owned by its session. Slots are granted through the
//! shared coordination record at `prefix/.lock`, updated only by
//! check-and-set. Holders whose contender entry is gone or unowned are
//! pruned by whoever next reads the record.

use crate::acquisition::{Acquisition, AttemptBudget};
use crate::monitor::{watch_semaphore, MonitorPolicy};
use crate::mutex::CoordinationMutex;
use crate::CoordinationError;
use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::{
    QueryOptions, SemaphoreLayout, SemaphoreOptions, SemaphoreRecord, SessionId,
    SEMAPHORE_FLAG_VALUE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A semaphore slot under one prefix
pub struct Semaphore<K, S> {
    kv: K,
    sessions: S,
    opts: SemaphoreOptions,
    layout: SemaphoreLayout,
    held: Arc<AtomicBool>,
    state: CoordinationMutex<Acquisition>,
}

impl<K: KvStore, S: SessionService> Semaphore<K, S> {
    /// Create a semaphore after validating `opts`
    pub fn new(kv: K, sessions: S, opts: SemaphoreOptions) -> Result<Self, CoordinationError> {
        opts.validate()?;
        let layout = SemaphoreLayout::new(&opts.prefix);
        Ok(Self {
            kv,
            sessions,
            opts,
            layout,
            held: Arc::new(AtomicBool::new(false)),
            state: CoordinationMutex::new(Acquisition::new()),
        })
    }

    pub fn prefix(&self) -> &str {
        self.layout.prefix()
    }

    pub fn limit(&self) -> u32 {
        self.opts.limit
    }

    pub fn options(&self) -> &SemaphoreOptions {
        &self.opts
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Acquire a slot, waiting while every slot is taken
    ///
    /// Returns a token that is cancelled as soon as the slot is lost or
    /// released.
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
        state.teardown().await;
        state.reset_token();

        let started = Instant::now();
        let session = match self.contend(&mut state, cancel).await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(prefix = %self.prefix(), error = %e, "semaphore acquisition failed");
                // A rejected contender key belongs to someone else
                let claimed = !matches!(e, CoordinationError::ContenderRejected { .. });
                if let Some(session) = state.session().filter(|_| claimed) {
                    self.withdraw(session).await;
                }
                state.teardown().await;
                return Err(e);
            }
        };

        self.held.store(true, Ordering::SeqCst);
        let kv = self.kv.clone();
        let layout = self.layout.clone();
        let watched = session.clone();
        let limit = self.opts.limit;
        let policy = self.monitor_policy();
        state.spawn_monitor(Arc::clone(&self.held), move |stop| {
            watch_semaphore(kv, layout, watched, limit, policy, stop)
        });
        tracing::info!(
            prefix = %self.prefix(),
            session = %session,
            limit,
            elapsed = ?started.elapsed(),
            "semaphore slot acquired"
        );
        Ok(state.lost_signal())
    }

    /// Announce this session and loop until the record admits it
    async fn contend(
        &self,
        state: &mut Acquisition,
        cancel: &CancellationToken,
    ) -> Result<SessionId, CoordinationError> {
        let session = state
            .start_session(&self.sessions, &self.opts.session, cancel)
            .await?;
        let contender = self.layout.contender_entry(&session, &self.opts.value);
        if !state.guarded(cancel, self.kv.acquire(&contender)).await? {
            return Err(CoordinationError::ContenderRejected { key: contender.key });
        }

        let prefix = self.layout.list_prefix();
        let mut budget = AttemptBudget::new(self.opts.try_once, self.opts.wait_time);
        let mut query = QueryOptions::blocking(self.opts.wait_time);

        loop {
            if let Some(e) = state.interrupted(cancel).await {
                return Err(e);
            }
            budget.next(&mut query)?;

            let listing = state.guarded(cancel, self.kv.list(&prefix, &query)).await?;
            let entries = listing.value;
            let current = self.layout.find_record(&entries);
            if let Some(entry) = current.filter(|e| e.flags != SEMAPHORE_FLAG_VALUE) {
                return Err(CoordinationError::Conflict {
                    key: entry.key.clone(),
                    flags: entry.flags,
                });
            }

            let mut record = SemaphoreRecord::decode(current, self.opts.limit)?;
            if record.limit != self.opts.limit {
                return Err(CoordinationError::LimitConflict {
                    remote: record.limit,
                    local: self.opts.limit,
                });
            }
            let pruned = record.prune_dead_holders(&self.layout, &entries);
            if !pruned.is_empty() {
                tracing::debug!(prefix = %self.prefix(), pruned = ?pruned, "pruned dead holders");
            }

            if !record.try_admit(&session) {
                tracing::debug!(prefix = %self.prefix(), holders = record.holders.len(), "semaphore full, waiting");
                query.wait_index = listing.last_index;
                continue;
            }

            let modify_index = current.map_or(0, |e| e.modify_index);
            let update = self.layout.record_entry(record.encode()?, modify_index);
            if state.guarded(cancel, self.kv.cas(&update)).await? {
                return Ok(session);
            }
            tracing::debug!(prefix = %self.prefix(), "record changed underneath, retrying");
        }
    }

    /// Best-effort removal of this session's contender entry
    async fn withdraw(&self, session: &SessionId) {
        let key = self.layout.contender_key(session);
        if let Err(e) = self.kv.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "failed to remove contender entry");
        }
    }

    /// Release a held slot
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

        let left = match state.session() {
            Some(session) => self.leave(session).await,
            None => Ok(()),
        };
        state.teardown().await;
        left?;

        tracing::info!(prefix = %self.prefix(), "semaphore slot released");
        Ok(())
    }

    /// Remove `session` from the record, then its contender entry
    async fn leave(&self, session: &SessionId) -> Result<(), CoordinationError> {
        let record_key = self.layout.record_key();
        loop {
            let current = self.kv.get(&record_key, &QueryOptions::new()).await?;
            let Some(entry) = current.value else {
                break;
            };
            let mut record = SemaphoreRecord::decode(Some(&entry), self.opts.limit)?;
            if !record.remove(session) {
                break;
            }
            let update = self
                .layout
                .record_entry(record.encode()?, entry.modify_index);
            if self.kv.cas(&update).await? {
                break;
            }
            tracing::debug!(prefix = %self.prefix(), "record changed during release, retrying");
        }
        self.kv.delete(&self.layout.contender_key(session)).await?;
        Ok(())
    }

    /// Delete the coordination record if no live holder remains
    pub async fn destroy(&self) -> Result<(), CoordinationError> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(CoordinationError::Held);
        };
        if self.is_held() {
            return Err(CoordinationError::Held);
        }
        state.teardown().await;

        let listing = self
            .kv
            .list(&self.layout.list_prefix(), &QueryOptions::new())
            .await?;
        let Some(entry) = self.layout.find_record(&listing.value) else {
            return Ok(());
        };
        if entry.flags != SEMAPHORE_FLAG_VALUE {
            return Err(CoordinationError::Conflict {
                key: entry.key.clone(),
                flags: entry.flags,
            });
        }

        let mut record = SemaphoreRecord::decode(Some(entry), self.opts.limit)?;
        record.prune_dead_holders(&self.layout, &listing.value);
        if !record.holders.is_empty() {
            return Err(CoordinationError::InUse);
        }
        if !self.kv.delete_cas(entry).await? {
            return Err(CoordinationError::InUse);
        }
        tracing::info!(prefix = %self.prefix(), "semaphore destroyed");
        Ok(())
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
#[path = "semaphore_tests.rs"]
mod tests;
