// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvlock-core: data model and decision logic for KV-backed coordination
//!
//! This crate provides:
//! - KV entry, query and session types shared by every adapter
//! - Lock and semaphore options with builders and serde support
//! - Pure observation of lock keys and the semaphore coordination record
//! - The reserved flag constants every participant must agree on

pub mod constants;
pub mod id;
pub mod kv;
pub mod lock;
pub mod options;
pub mod semaphore;
pub mod session;

// Re-exports
pub use constants::{LOCK_FLAG_VALUE, SEMAPHORE_FLAG_VALUE, SEMAPHORE_RECORD_KEY};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use kv::{validate_key, Consistency, KeyError, KvEntry, QueryOptions, QueryResponse};
pub use lock::{lock_entry, LockObservation};
pub use options::{LockOptions, OptionsError, SemaphoreOptions, SessionPolicy};
pub use semaphore::{RecordError, SemaphoreLayout, SemaphoreRecord};
pub use session::{SessionBehavior, SessionId, SessionRequest};
