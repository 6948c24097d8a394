// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lock or semaphore a command operates on

use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::{LockOptions, SemaphoreOptions};
use kvlock_engine::{CancellationToken, CoordinationError, Coordinator, Lock, Semaphore};
use std::fmt;

/// Key of the lock held under `prefix`
pub fn lock_key(prefix: &str) -> String {
    format!("{}/.lock", prefix.trim_end_matches('/'))
}

pub enum Primitive<K, S> {
    Lock(Lock<K, S>),
    Semaphore(Semaphore<K, S>),
}

impl<K: KvStore, S: SessionService> Primitive<K, S> {
    pub fn lock(coordinator: &Coordinator<K, S>, opts: LockOptions) -> Result<Self, CoordinationError> {
        coordinator.lock_with(opts).map(Primitive::Lock)
    }

    pub fn semaphore(
        coordinator: &Coordinator<K, S>,
        opts: SemaphoreOptions,
    ) -> Result<Self, CoordinationError> {
        coordinator.semaphore_with(opts).map(Primitive::Semaphore)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Primitive::Lock(_) => Kind::Lock,
            Primitive::Semaphore(_) => Kind::Semaphore,
        }
    }

    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CancellationToken, CoordinationError> {
        match self {
            Primitive::Lock(lock) => lock.acquire(cancel).await,
            Primitive::Semaphore(semaphore) => semaphore.acquire(cancel).await,
        }
    }

    pub async fn release(&self) -> Result<(), CoordinationError> {
        match self {
            Primitive::Lock(lock) => lock.release().await,
            Primitive::Semaphore(semaphore) => semaphore.release().await,
        }
    }

    pub async fn destroy(&self) -> Result<(), CoordinationError> {
        match self {
            Primitive::Lock(lock) => lock.destroy().await,
            Primitive::Semaphore(semaphore) => semaphore.destroy().await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Lock,
    Semaphore,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Lock => write!(f, "lock"),
            Kind::Semaphore => write!(f, "semaphore"),
        }
    }
}
