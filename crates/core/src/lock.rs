// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock key observation
//!
//! A lock is a single KV entry tagged with [`LOCK_FLAG_VALUE`] whose owning
//! session is the holder. Observing the entry decides what an acquirer,
//! monitor or destroyer does next; the store's CAS decides who wins.

use crate::constants::LOCK_FLAG_VALUE;
use crate::kv::KvEntry;
use crate::session::SessionId;

/// What a read of a lock key says about ownership
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockObservation {
    /// No entry at the key
    Absent,
    /// A lock entry nobody holds
    Vacant { modify_index: u64 },
    /// Held by the observing session
    OwnedBySelf,
    /// Held by another session
    OwnedByOther { holder: SessionId },
    /// The key is in use by something that is not a lock
    Conflict { flags: u64 },
}

impl LockObservation {
    /// Classify an entry from the point of view of `own` (if any)
    pub fn of(entry: Option<&KvEntry>, own: Option<&SessionId>) -> Self {
        let Some(entry) = entry else {
            return LockObservation::Absent;
        };
        if entry.flags != LOCK_FLAG_VALUE {
            return LockObservation::Conflict { flags: entry.flags };
        }
        match &entry.session {
            Some(holder) if !holder.0.is_empty() => {
                if own == Some(holder) {
                    LockObservation::OwnedBySelf
                } else {
                    LockObservation::OwnedByOther {
                        holder: holder.clone(),
                    }
                }
            }
            _ => LockObservation::Vacant {
                modify_index: entry.modify_index,
            },
        }
    }
}

/// The entry written to claim or release a lock for `session`
pub fn lock_entry(key: &str, value: &[u8], session: &SessionId) -> KvEntry {
    KvEntry::new(key)
        .with_value(value.to_vec())
        .with_flags(LOCK_FLAG_VALUE)
        .with_session(session.clone())
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
