// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity and creation parameters
//!
//! A session is an ephemeral object owned by the coordination service. Keys
//! reference it by id; when it expires or is destroyed the service applies
//! its [`SessionBehavior`] to every key it owns.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::DEFAULT_SESSION_TTL;

/// Identifier of a session on the coordination service
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What the service does with owned keys when a session is invalidated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBehavior {
    /// Clear the owner of every held key, keeping the values
    #[default]
    Release,
    /// Delete every held key
    Delete,
}

impl SessionBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBehavior::Release => "release",
            SessionBehavior::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SessionBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for creating a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Human-readable name shown by the service
    pub name: String,
    /// Time after which an unrenewed session is invalidated
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    #[serde(default)]
    pub behavior: SessionBehavior,
    /// Cool-down applied to keys released by invalidation (service default if unset)
    #[serde(default, with = "humantime_serde")]
    pub lock_delay: Option<Duration>,
}

impl SessionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: DEFAULT_SESSION_TTL,
            behavior: SessionBehavior::Release,
            lock_delay: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_behavior(mut self, behavior: SessionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_lock_delay(mut self, delay: Duration) -> Self {
        self.lock_delay = Some(delay);
        self
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
