// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-owner async mutex guarding one primitive's state transitions
//!
//! Only serializes callers within this process. The store's check-and-set
//! decides ownership across processes.

use std::ops::{Deref, DerefMut};
use tokio::sync::{Mutex, MutexGuard};

pub struct CoordinationMutex<T> {
    inner: Mutex<T>,
}

/// Scoped ownership of a [`CoordinationMutex`], released on drop
pub struct CoordinationGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> CoordinationMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Wait for ownership
    pub async fn lock(&self) -> CoordinationGuard<'_, T> {
        let guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("waiting for coordination mutex");
                self.inner.lock().await
            }
        };
        CoordinationGuard { guard }
    }

    /// Take ownership only if nobody holds it
    pub fn try_lock(&self) -> Option<CoordinationGuard<'_, T>> {
        self.inner
            .try_lock()
            .ok()
            .map(|guard| CoordinationGuard { guard })
    }
}

impl<T> Deref for CoordinationGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for CoordinationGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;
