// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session service adapters

use async_trait::async_trait;
use kvlock_core::{SessionId, SessionRequest};
use std::time::Duration;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session expired: {0}")]
    Expired(SessionId),
    #[error("session service unavailable: {0}")]
    Unavailable(String),
    #[error("session service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode session response: {0}")]
    Decode(String),
}

/// Adapter for the service that owns ephemeral sessions
#[async_trait]
pub trait SessionService: Clone + Send + Sync + 'static {
    /// Create a session, returning its id
    async fn create(&self, request: &SessionRequest) -> Result<SessionId, SessionError>;

    /// Renew a session, returning the TTL the service granted
    ///
    /// Fails with [`SessionError::Expired`] if the session no longer exists.
    /// A zero TTL means the service did not report one.
    async fn renew(&self, id: &SessionId) -> Result<Duration, SessionError>;

    /// Destroy a session, applying its invalidation behavior to owned keys
    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}
