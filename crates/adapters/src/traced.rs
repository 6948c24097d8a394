// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::kv::{KvError, KvStore};
use crate::session::{SessionError, SessionService};
use async_trait::async_trait;
use kvlock_core::{KvEntry, QueryOptions, QueryResponse, SessionId, SessionRequest};
use std::time::{Duration, Instant};
use tracing::Instrument;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Wrapper that adds tracing to any KvStore
#[derive(Clone)]
pub struct TracedKvStore<K> {
    inner: K,
}

impl<K> TracedKvStore<K> {
    pub fn new(inner: K) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }
}

impl<K: KvStore> TracedKvStore<K> {
    async fn traced_write(
        &self,
        op: &'static str,
        entry: &KvEntry,
        call: impl std::future::Future<Output = Result<bool, KvError>>,
    ) -> Result<bool, KvError> {
        let span = tracing::debug_span!("kv.write", op, key = %entry.key, index = entry.modify_index);
        async move {
            let start = Instant::now();
            let result = call.await;
            match &result {
                Ok(applied) => {
                    tracing::debug!(applied, elapsed_ms = elapsed_ms(start), "write done")
                }
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "write failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<K: KvStore> KvStore for TracedKvStore<K> {
    async fn get(
        &self,
        key: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Option<KvEntry>>, KvError> {
        let span = tracing::debug_span!("kv.get", key, wait_index = opts.wait_index);
        async {
            let start = Instant::now();
            let result = self.inner.get(key, opts).await;
            match &result {
                Ok(response) => tracing::trace!(
                    found = response.value.is_some(),
                    last_index = response.last_index,
                    elapsed_ms = elapsed_ms(start),
                    "read"
                ),
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "read failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn list(
        &self,
        prefix: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Vec<KvEntry>>, KvError> {
        let span = tracing::debug_span!("kv.list", prefix, wait_index = opts.wait_index);
        async {
            let start = Instant::now();
            let result = self.inner.list(prefix, opts).await;
            match &result {
                Ok(response) => tracing::trace!(
                    entries = response.value.len(),
                    last_index = response.last_index,
                    elapsed_ms = elapsed_ms(start),
                    "listed"
                ),
                Err(e) => tracing::warn!(elapsed_ms = elapsed_ms(start), error = %e, "list failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn put(&self, entry: &KvEntry) -> Result<bool, KvError> {
        self.traced_write("put", entry, self.inner.put(entry)).await
    }

    async fn cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        self.traced_write("cas", entry, self.inner.cas(entry)).await
    }

    async fn acquire(&self, entry: &KvEntry) -> Result<bool, KvError> {
        self.traced_write("acquire", entry, self.inner.acquire(entry))
            .await
    }

    async fn release(&self, entry: &KvEntry) -> Result<bool, KvError> {
        self.traced_write("release", entry, self.inner.release(entry))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let entry = KvEntry::new(key);
        self.traced_write("delete", &entry, self.inner.delete(key))
            .await
    }

    async fn delete_cas(&self, entry: &KvEntry) -> Result<bool, KvError> {
        self.traced_write("delete_cas", entry, self.inner.delete_cas(entry))
            .await
    }
}

/// Wrapper that adds tracing to any SessionService
#[derive(Clone)]
pub struct TracedSessionService<S> {
    inner: S,
}

impl<S> TracedSessionService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: SessionService> SessionService for TracedSessionService<S> {
    async fn create(&self, request: &SessionRequest) -> Result<SessionId, SessionError> {
        let span = tracing::info_span!("session.create", name = %request.name);
        async {
            tracing::info!(
                ttl = ?request.ttl,
                behavior = %request.behavior,
                "creating"
            );
            let start = Instant::now();
            let result = self.inner.create(request).await;
            match &result {
                Ok(id) => tracing::info!(
                    session = %id,
                    elapsed_ms = elapsed_ms(start),
                    "session created"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "create failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn renew(&self, id: &SessionId) -> Result<Duration, SessionError> {
        let span = tracing::debug_span!("session.renew", session = %id);
        async {
            let result = self.inner.renew(id).await;
            match &result {
                Ok(ttl) => tracing::debug!(ttl = ?ttl, "renewed"),
                Err(SessionError::Expired(_)) => tracing::warn!("session expired"),
                Err(e) => tracing::warn!(error = %e, "renew failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        let span = tracing::info_span!("session.destroy", session = %id);
        async {
            let result = self.inner.destroy(id).await;
            // Destroy failing is often acceptable (session already gone)
            match &result {
                Ok(()) => tracing::info!("destroyed"),
                Err(e) => tracing::warn!(error = %e, "destroy failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
