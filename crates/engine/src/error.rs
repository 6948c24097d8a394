// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for locks and semaphores

use kvlock_adapters::{KvError, SessionError};
use kvlock_core::{OptionsError, RecordError, SessionId};
use std::time::Duration;
use thiserror::Error;

/// Errors from lock and semaphore operations
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("already held")]
    Held,
    #[error("not held")]
    NotHeld,
    #[error("in use by another session")]
    InUse,
    #[error("key {key} is not a compatible lock or semaphore (flags {flags:#x})")]
    Conflict { key: String, flags: u64 },
    #[error("semaphore limit conflict: remote limit is {remote}, local limit is {local}")]
    LimitConflict { remote: u32, local: u32 },
    #[error("gave up acquiring after {elapsed:?}")]
    MaxAttemptsReached { elapsed: Duration },
    #[error("session expired: {0}")]
    SessionExpired(SessionId),
    #[error("acquisition cancelled")]
    Cancelled,
    #[error("contender entry {key} could not be claimed")]
    ContenderRejected { key: String },
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Session(SessionError),
}

impl From<SessionError> for CoordinationError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired(id) => CoordinationError::SessionExpired(id),
            other => CoordinationError::Session(other),
        }
    }
}

impl CoordinationError {
    /// The caller's cancellation signal fired
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoordinationError::Cancelled)
    }

    /// Another participant got there first and we gave up waiting
    pub fn is_lost_race(&self) -> bool {
        matches!(
            self,
            CoordinationError::MaxAttemptsReached { .. } | CoordinationError::NotHeld
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
