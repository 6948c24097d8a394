// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvlock engine: distributed locks and semaphores over a KV store
//!
//! A [`Lock`] or [`Semaphore`] acquires ownership through the store's
//! check-and-set, keeps its session alive while held and watches the store
//! so the caller learns about loss through a cancellation token.

mod acquisition;
mod coordinator;
mod error;
mod keepalive;
mod lock;
mod monitor;
mod mutex;
mod semaphore;

pub use coordinator::Coordinator;
pub use error::CoordinationError;
pub use keepalive::renew_periodic;
pub use lock::Lock;
pub use mutex::{CoordinationGuard, CoordinationMutex};
pub use semaphore::Semaphore;

pub use tokio_util::sync::CancellationToken;
