// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point tying a KV store and session service to locks and semaphores

use crate::lock::Lock;
use crate::semaphore::Semaphore;
use crate::CoordinationError;
use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::{LockOptions, SemaphoreOptions};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Creates locks and semaphores that share one store and session service
#[derive(Clone)]
pub struct Coordinator<K, S> {
    kv: K,
    sessions: S,
}

impl<C: KvStore + SessionService> Coordinator<C, C> {
    /// Use one client for both the KV store and sessions
    pub fn with_client(client: C) -> Self {
        Self::new(client.clone(), client)
    }
}

impl<K: KvStore, S: SessionService> Coordinator<K, S> {
    pub fn new(kv: K, sessions: S) -> Self {
        Self { kv, sessions }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// A lock on `key` with default options
    pub fn lock(&self, key: impl Into<String>) -> Result<Lock<K, S>, CoordinationError> {
        self.lock_with(LockOptions::new(key))
    }

    pub fn lock_with(&self, opts: LockOptions) -> Result<Lock<K, S>, CoordinationError> {
        Lock::new(self.kv.clone(), self.sessions.clone(), opts)
    }

    /// A semaphore under `prefix` with default options
    pub fn semaphore(
        &self,
        prefix: impl Into<String>,
        limit: u32,
    ) -> Result<Semaphore<K, S>, CoordinationError> {
        self.semaphore_with(SemaphoreOptions::new(prefix, limit))
    }

    pub fn semaphore_with(
        &self,
        opts: SemaphoreOptions,
    ) -> Result<Semaphore<K, S>, CoordinationError> {
        Semaphore::new(self.kv.clone(), self.sessions.clone(), opts)
    }

    /// Create and acquire a lock, returning it with its loss signal
    pub async fn acquire_lock(
        &self,
        opts: LockOptions,
        cancel: &CancellationToken,
    ) -> Result<(Lock<K, S>, CancellationToken), CoordinationError> {
        let lock = self.lock_with(opts)?;
        let lost = lock.acquire(cancel).await?;
        Ok((lock, lost))
    }

    /// Create and acquire a semaphore slot, returning it with its loss signal
    pub async fn acquire_semaphore(
        &self,
        opts: SemaphoreOptions,
        cancel: &CancellationToken,
    ) -> Result<(Semaphore<K, S>, CancellationToken), CoordinationError> {
        let semaphore = self.semaphore_with(opts)?;
        let lost = semaphore.acquire(cancel).await?;
        Ok((semaphore, lost))
    }

    /// Run `action` while holding a lock
    ///
    /// The action receives the loss signal. The lock is released afterwards;
    /// if it was lost in the meantime the release fails with
    /// [`CoordinationError::NotHeld`] and the action's result is discarded.
    pub async fn execute_locked<F, Fut, T>(
        &self,
        opts: LockOptions,
        cancel: &CancellationToken,
        action: F,
    ) -> Result<T, CoordinationError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let (lock, lost) = self.acquire_lock(opts, cancel).await?;
        let output = action(lost).await;
        lock.release().await?;
        Ok(output)
    }

    /// Run `action` while holding a semaphore slot
    pub async fn execute_in_semaphore<F, Fut, T>(
        &self,
        opts: SemaphoreOptions,
        cancel: &CancellationToken,
        action: F,
    ) -> Result<T, CoordinationError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let (semaphore, lost) = self.acquire_semaphore(opts, cancel).await?;
        let output = action(lost).await;
        semaphore.release().await?;
        Ok(output)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
