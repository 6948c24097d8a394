// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store adapters

use async_trait::async_trait;
use kvlock_core::{KeyError, KvEntry, QueryOptions, QueryResponse};
use thiserror::Error;

/// Errors from KV operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
    #[error(transparent)]
    InvalidKey(#[from] KeyError),
    #[error("entry for {0} has no session")]
    MissingSession(String),
}

impl KvError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            KvError::Unavailable(_) => true,
            KvError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Adapter for a key-value store with check-and-set and blocking queries
///
/// Writes return `Ok(false)` when the store rejected the condition (a CAS
/// index mismatch, a key held by another session) and `Err` only when the
/// request itself failed.
#[async_trait]
pub trait KvStore: Clone + Send + Sync + 'static {
    /// Read one key, blocking while `opts` asks for it
    async fn get(
        &self,
        key: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Option<KvEntry>>, KvError>;

    /// Read every key under `prefix`, blocking while `opts` asks for it
    async fn list(
        &self,
        prefix: &str,
        opts: &QueryOptions,
    ) -> Result<QueryResponse<Vec<KvEntry>>, KvError>;

    /// Unconditionally write value and flags
    async fn put(&self, entry: &KvEntry) -> Result<bool, KvError>;

    /// Write only if the key's modify index equals `entry.modify_index`
    /// (0 means the key must not exist)
    async fn cas(&self, entry: &KvEntry) -> Result<bool, KvError>;

    /// Write and take ownership for `entry.session` if nobody else holds the key
    async fn acquire(&self, entry: &KvEntry) -> Result<bool, KvError>;

    /// Write and drop ownership if `entry.session` holds the key
    async fn release(&self, entry: &KvEntry) -> Result<bool, KvError>;

    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Delete only if the key's modify index equals `entry.modify_index`
    async fn delete_cas(&self, entry: &KvEntry) -> Result<bool, KvError>;
}

/// Session id an ownership write is made for
pub(crate) fn required_session(entry: &KvEntry) -> Result<&kvlock_core::SessionId, KvError> {
    entry
        .session
        .as_ref()
        .filter(|s| !s.as_str().is_empty())
        .ok_or_else(|| KvError::MissingSession(entry.key.clone()))
}
