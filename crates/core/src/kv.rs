// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KV entries and blocking-query options

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::session::SessionId;

/// Errors from key validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,
    #[error("key must not begin with '/': {0}")]
    LeadingSlash(String),
}

/// Check that a key (or prefix) is acceptable to the store
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(KeyError::LeadingSlash(key.to_string()));
    }
    Ok(())
}

/// A key-value entry as stored by the coordination service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
    /// Opaque tag; the reserved constants mark locks and semaphores
    pub flags: u64,
    /// Owning session, if the key is currently held
    pub session: Option<SessionId>,
    pub create_index: u64,
    /// Index of the last write, the condition for check-and-set
    pub modify_index: u64,
    /// Number of times the key has been acquired
    pub lock_index: u64,
}

impl KvEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_modify_index(mut self, index: u64) -> Self {
        self.modify_index = index;
        self
    }

    /// Whether any session currently owns this key
    pub fn is_owned(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.0.is_empty())
    }

    pub fn is_owned_by(&self, session: &SessionId) -> bool {
        self.session.as_ref() == Some(session)
    }
}

/// Read consistency requested from the service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    #[default]
    Default,
    /// Linearizable read through the leader
    Consistent,
    /// Any server may answer, possibly with stale data
    Stale,
}

/// Options for a (possibly blocking) read
///
/// A read with a non-zero `wait_index` blocks on the server until the data
/// changes past that index or `wait_time` elapses. A zero index never blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub wait_index: u64,
    pub wait_time: Duration,
    pub consistency: Consistency,
}

impl QueryOptions {
    /// A read that returns immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// A read that may block for up to `wait_time` once a wait index is set
    pub fn blocking(wait_time: Duration) -> Self {
        Self {
            wait_index: 0,
            wait_time,
            consistency: Consistency::Default,
        }
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.wait_index > 0 && !self.wait_time.is_zero()
    }
}

/// Result of a read together with the index it reflects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponse<T> {
    pub value: T,
    pub last_index: u64,
}

impl<T> QueryResponse<T> {
    pub fn new(value: T, last_index: u64) -> Self {
        Self { value, last_index }
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
