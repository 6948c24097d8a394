// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ownership monitors for held primitives.
//!
//! A monitor long-polls the store with consistent reads and returns as soon
//! as the holding session no longer owns the primitive. Transient read
//! failures are retried a bounded number of times on a fixed interval.

use crate::CoordinationError;
use kvlock_adapters::{KvError, KvStore};
use kvlock_core::{
    Consistency, KvEntry, QueryOptions, SemaphoreLayout, SemaphoreRecord, SessionId,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a monitor loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MonitorOutcome {
    /// Asked to stop while ownership was intact
    Stopped,
    /// The session no longer owns the primitive
    Lost,
}

/// Polling and retry settings for a monitor
#[derive(Debug, Clone, Copy)]
pub(crate) struct MonitorPolicy {
    pub wait_time: Duration,
    pub retries: u32,
    pub retry_time: Duration,
}

/// Consecutive transient failures still allowed before giving up
struct RetryBudget {
    policy: MonitorPolicy,
    left: u32,
}

impl RetryBudget {
    fn new(policy: MonitorPolicy) -> Self {
        Self {
            policy,
            left: policy.retries,
        }
    }

    fn reset(&mut self) {
        self.left = self.policy.retries;
    }

    /// Sleep before the next read, or hand back `err` when out of retries
    async fn absorb(
        &mut self,
        err: KvError,
        stop: &CancellationToken,
    ) -> Result<Option<MonitorOutcome>, CoordinationError> {
        if self.left == 0 || !err.is_retryable() {
            return Err(err.into());
        }
        self.left -= 1;
        tracing::debug!(error = %err, retries_left = self.left, "monitor read failed, retrying");
        tokio::select! {
            _ = stop.cancelled() => Ok(Some(MonitorOutcome::Stopped)),
            _ = tokio::time::sleep(self.policy.retry_time) => Ok(None),
        }
    }
}

fn consistent_query(policy: &MonitorPolicy) -> QueryOptions {
    QueryOptions::blocking(policy.wait_time).with_consistency(Consistency::Consistent)
}

/// Watch a lock key until `session` stops owning it or `stop` fires
pub(crate) async fn watch_lock<K: KvStore>(
    kv: K,
    key: String,
    session: SessionId,
    policy: MonitorPolicy,
    stop: CancellationToken,
) -> Result<MonitorOutcome, CoordinationError> {
    let mut query = consistent_query(&policy);
    let mut retry = RetryBudget::new(policy);

    loop {
        let read = tokio::select! {
            _ = stop.cancelled() => return Ok(MonitorOutcome::Stopped),
            read = kv.get(&key, &query) => read,
        };
        match read {
            Ok(response) => {
                retry.reset();
                let owned = response
                    .value
                    .as_ref()
                    .is_some_and(|entry| entry.is_owned_by(&session));
                if !owned {
                    tracing::info!(key = %key, session = %session, "lock lost");
                    return Ok(MonitorOutcome::Lost);
                }
                query.wait_index = response.last_index;
            }
            Err(e) => {
                if let Some(outcome) = retry.absorb(e, &stop).await? {
                    return Ok(outcome);
                }
                query.wait_index = 0;
            }
        }
    }
}

/// Watch a semaphore until `session` drops out of the pruned holder set or
/// `stop` fires
pub(crate) async fn watch_semaphore<K: KvStore>(
    kv: K,
    layout: SemaphoreLayout,
    session: SessionId,
    limit: u32,
    policy: MonitorPolicy,
    stop: CancellationToken,
) -> Result<MonitorOutcome, CoordinationError> {
    let prefix = layout.list_prefix();
    let mut query = consistent_query(&policy);
    let mut retry = RetryBudget::new(policy);

    loop {
        let read = tokio::select! {
            _ = stop.cancelled() => return Ok(MonitorOutcome::Stopped),
            read = kv.list(&prefix, &query) => read,
        };
        match read {
            Ok(response) => {
                retry.reset();
                if !still_holder(&layout, &response.value, &session, limit)? {
                    tracing::info!(prefix = %layout.prefix(), session = %session, "semaphore slot lost");
                    return Ok(MonitorOutcome::Lost);
                }
                query.wait_index = response.last_index;
            }
            Err(e) => {
                if let Some(outcome) = retry.absorb(e, &stop).await? {
                    return Ok(outcome);
                }
                query.wait_index = 0;
            }
        }
    }
}

fn still_holder(
    layout: &SemaphoreLayout,
    entries: &[KvEntry],
    session: &SessionId,
    limit: u32,
) -> Result<bool, CoordinationError> {
    let Some(record_entry) = layout.find_record(entries) else {
        return Ok(false);
    };
    let mut record = SemaphoreRecord::decode(Some(record_entry), limit)?;
    record.prune_dead_holders(layout, entries);
    Ok(record.contains(session))
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
