// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock and semaphore options
//!
//! Options deserialize from JSON with humantime durations (`"15s"`), and every
//! field has a default so a config only needs to name the key or prefix.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_LOCK_RETRY_TIME, DEFAULT_LOCK_SESSION_NAME, DEFAULT_MONITOR_RETRY_TIME,
    DEFAULT_SEMAPHORE_SESSION_NAME, DEFAULT_WAIT_TIME,
};
use crate::kv::{validate_key, KeyError};
use crate::session::{SessionBehavior, SessionId, SessionRequest};

/// Errors from option validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),
    #[error("semaphore limit must be at least 1")]
    ZeroLimit,
    #[error("wait time must be greater than zero")]
    ZeroWaitTime,
    #[error("session ttl must be greater than zero")]
    ZeroTtl,
}

/// Where the session backing a lock or semaphore comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Use a session the caller owns; it is never renewed or destroyed here
    Existing(SessionId),
    /// Create a session per acquisition, renew it while held, destroy on release
    Create(SessionRequest),
}

impl SessionPolicy {
    /// Switch to a created session (if needed) and update its request
    fn update_request(&mut self, default_name: &str, f: impl FnOnce(&mut SessionRequest)) {
        match self {
            SessionPolicy::Create(request) => f(request),
            SessionPolicy::Existing(_) => {
                let mut request = SessionRequest::new(default_name);
                f(&mut request);
                *self = SessionPolicy::Create(request);
            }
        }
    }

    fn validate(&self) -> Result<(), OptionsError> {
        match self {
            SessionPolicy::Create(request) if request.ttl.is_zero() => Err(OptionsError::ZeroTtl),
            _ => Ok(()),
        }
    }
}

/// Options for a [lock](crate::lock)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOptions {
    /// Key of the lock entry
    pub key: String,
    /// Payload stored in the entry while held
    pub value: Vec<u8>,
    pub session: SessionPolicy,
    /// Upper bound of one blocking query, and the try-once budget
    #[serde(with = "humantime_serde")]
    pub wait_time: Duration,
    /// Sleep between claim attempts while the key is vacant but not claimable
    #[serde(with = "humantime_serde")]
    pub retry_time: Duration,
    /// Transient monitor failures tolerated before the lock counts as lost
    pub monitor_retries: u32,
    #[serde(with = "humantime_serde")]
    pub monitor_retry_time: Duration,
    /// Give up once `wait_time` has elapsed instead of waiting indefinitely
    pub try_once: bool,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            key: String::new(),
            value: Vec::new(),
            session: SessionPolicy::Create(SessionRequest::new(DEFAULT_LOCK_SESSION_NAME)),
            wait_time: DEFAULT_WAIT_TIME,
            retry_time: DEFAULT_LOCK_RETRY_TIME,
            monitor_retries: 0,
            monitor_retry_time: DEFAULT_MONITOR_RETRY_TIME,
            try_once: false,
        }
    }
}

impl LockOptions {
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

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = SessionPolicy::Existing(session);
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session
            .update_request(DEFAULT_LOCK_SESSION_NAME, |r| r.name = name.into());
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session
            .update_request(DEFAULT_LOCK_SESSION_NAME, |r| r.ttl = ttl);
        self
    }

    pub fn with_session_behavior(mut self, behavior: SessionBehavior) -> Self {
        self.session
            .update_request(DEFAULT_LOCK_SESSION_NAME, |r| r.behavior = behavior);
        self
    }

    pub fn with_lock_delay(mut self, delay: Duration) -> Self {
        self.session
            .update_request(DEFAULT_LOCK_SESSION_NAME, |r| r.lock_delay = Some(delay));
        self
    }

    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_retry_time(mut self, retry_time: Duration) -> Self {
        self.retry_time = retry_time;
        self
    }

    pub fn with_monitor_retries(mut self, retries: u32, interval: Duration) -> Self {
        self.monitor_retries = retries;
        self.monitor_retry_time = interval;
        self
    }

    pub fn with_try_once(mut self, try_once: bool) -> Self {
        self.try_once = try_once;
        self
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        validate_key(&self.key)?;
        if self.wait_time.is_zero() {
            return Err(OptionsError::ZeroWaitTime);
        }
        self.session.validate()
    }
}

/// Options for a [semaphore](crate::semaphore)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaphoreOptions {
    /// Prefix holding the record and contender entries
    pub prefix: String,
    /// Maximum concurrent holders; every participant must agree on it
    pub limit: u32,
    /// Payload stored in this participant's contender entry
    pub value: Vec<u8>,
    pub session: SessionPolicy,
    #[serde(with = "humantime_serde")]
    pub wait_time: Duration,
    pub monitor_retries: u32,
    #[serde(with = "humantime_serde")]
    pub monitor_retry_time: Duration,
    pub try_once: bool,
}

impl Default for SemaphoreOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            limit: 1,
            value: Vec::new(),
            session: SessionPolicy::Create(SessionRequest::new(DEFAULT_SEMAPHORE_SESSION_NAME)),
            wait_time: DEFAULT_WAIT_TIME,
            monitor_retries: 0,
            monitor_retry_time: DEFAULT_MONITOR_RETRY_TIME,
            try_once: false,
        }
    }
}

impl SemaphoreOptions {
    pub fn new(prefix: impl Into<String>, limit: u32) -> Self {
        Self {
            prefix: prefix.into(),
            limit,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = SessionPolicy::Existing(session);
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session
            .update_request(DEFAULT_SEMAPHORE_SESSION_NAME, |r| r.name = name.into());
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session
            .update_request(DEFAULT_SEMAPHORE_SESSION_NAME, |r| r.ttl = ttl);
        self
    }

    pub fn with_session_behavior(mut self, behavior: SessionBehavior) -> Self {
        self.session
            .update_request(DEFAULT_SEMAPHORE_SESSION_NAME, |r| r.behavior = behavior);
        self
    }

    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_monitor_retries(mut self, retries: u32, interval: Duration) -> Self {
        self.monitor_retries = retries;
        self.monitor_retry_time = interval;
        self
    }

    pub fn with_try_once(mut self, try_once: bool) -> Self {
        self.try_once = try_once;
        self
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        validate_key(&self.prefix)?;
        if self.limit == 0 {
            return Err(OptionsError::ZeroLimit);
        }
        if self.wait_time.is_zero() {
            return Err(OptionsError::ZeroWaitTime);
        }
        self.session.validate()
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
