// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semaphore coordination record and key layout
//!
//! A semaphore lives under a prefix:
//! - `prefix/.lock` holds the coordination record `{limit, holders}`
//! - `prefix/<session>` is one contender entry per participant, owned by that
//!   participant's session
//!
//! Holders whose contender entry is gone (or no longer owned) are dead and
//! get pruned by whoever next rewrites the record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::constants::{SEMAPHORE_FLAG_VALUE, SEMAPHORE_RECORD_KEY};
use crate::kv::KvEntry;
use crate::session::SessionId;

/// Errors from encoding or decoding the coordination record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to decode semaphore record at {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode semaphore record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Shared record of the semaphore's limit and current holders
///
/// Wire format: `{"Limit": 2, "Holders": {"<session>": true}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreRecord {
    #[serde(rename = "Limit")]
    pub limit: u32,
    #[serde(
        rename = "Holders",
        default,
        serialize_with = "holders_to_map",
        deserialize_with = "holders_from_map"
    )]
    pub holders: BTreeSet<SessionId>,
}

fn holders_to_map<S: Serializer>(
    holders: &BTreeSet<SessionId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let map: BTreeMap<&str, bool> = holders.iter().map(|h| (h.as_str(), true)).collect();
    map.serialize(serializer)
}

fn holders_from_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeSet<SessionId>, D::Error> {
    let map: Option<BTreeMap<String, bool>> = Option::deserialize(deserializer)?;
    Ok(map
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, held)| *held)
        .map(|(id, _)| SessionId(id))
        .collect())
}

impl SemaphoreRecord {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            holders: BTreeSet::new(),
        }
    }

    /// Decode the record entry, or start a fresh one with `local_limit`
    /// when the record does not exist yet
    pub fn decode(entry: Option<&KvEntry>, local_limit: u32) -> Result<Self, RecordError> {
        match entry {
            Some(entry) if !entry.value.is_empty() => serde_json::from_slice(&entry.value)
                .map_err(|source| RecordError::Decode {
                    key: entry.key.clone(),
                    source,
                }),
            _ => Ok(Self::new(local_limit)),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(RecordError::Encode)
    }

    pub fn contains(&self, session: &SessionId) -> bool {
        self.holders.contains(session)
    }

    pub fn is_full(&self) -> bool {
        self.holders.len() >= self.limit as usize
    }

    /// Add `session` as a holder if a slot is free
    pub fn try_admit(&mut self, session: &SessionId) -> bool {
        if self.contains(session) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.holders.insert(session.clone())
    }

    /// Remove `session`, returning whether it was a holder
    pub fn remove(&mut self, session: &SessionId) -> bool {
        self.holders.remove(session)
    }

    /// Drop holders without a live contender entry, returning the ones removed
    pub fn prune_dead_holders(
        &mut self,
        layout: &SemaphoreLayout,
        entries: &[KvEntry],
    ) -> Vec<SessionId> {
        let dead: Vec<SessionId> = self
            .holders
            .iter()
            .filter(|holder| !layout.has_live_contender(entries, holder))
            .cloned()
            .collect();
        for holder in &dead {
            self.holders.remove(holder);
        }
        dead
    }
}

/// Key layout of one semaphore prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SemaphoreLayout {
    prefix: String,
}

impl SemaphoreLayout {
    /// Trailing slashes on `prefix` are ignored
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix to list, covering the record and every contender
    pub fn list_prefix(&self) -> String {
        format!("{}/", self.prefix)
    }

    pub fn record_key(&self) -> String {
        format!("{}/{}", self.prefix, SEMAPHORE_RECORD_KEY)
    }

    pub fn contender_key(&self, session: &SessionId) -> String {
        format!("{}/{}", self.prefix, session)
    }

    /// Find the coordination record in a listing of the prefix
    pub fn find_record<'a>(&self, entries: &'a [KvEntry]) -> Option<&'a KvEntry> {
        let key = self.record_key();
        entries.iter().find(|e| e.key == key)
    }

    fn has_live_contender(&self, entries: &[KvEntry], holder: &SessionId) -> bool {
        let key = self.contender_key(holder);
        entries.iter().any(|e| e.key == key && e.is_owned())
    }

    /// Contender entry announcing `session` as a participant
    pub fn contender_entry(&self, session: &SessionId, value: &[u8]) -> KvEntry {
        KvEntry::new(self.contender_key(session))
            .with_value(value.to_vec())
            .with_flags(SEMAPHORE_FLAG_VALUE)
            .with_session(session.clone())
    }

    /// Record entry to check-and-set against `modify_index` (0 creates it)
    pub fn record_entry(&self, value: Vec<u8>, modify_index: u64) -> KvEntry {
        KvEntry::new(self.record_key())
            .with_value(value)
            .with_flags(SEMAPHORE_FLAG_VALUE)
            .with_modify_index(modify_index)
    }
}

#[cfg(test)]
#[path = "semaphore_tests.rs"]
mod tests;
