// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::constants::SEMAPHORE_FLAG_VALUE;

fn me() -> SessionId {
    SessionId::new("me")
}

#[test]
fn missing_key_is_absent() {
    assert_eq!(LockObservation::of(None, Some(&me())), LockObservation::Absent);
}

#[test]
fn unowned_lock_entry_is_vacant() {
    let entry = KvEntry::new("svc/leader")
        .with_flags(LOCK_FLAG_VALUE)
        .with_modify_index(42);
    let observed = LockObservation::of(Some(&entry), Some(&me()));
    assert_eq!(observed, LockObservation::Vacant { modify_index: 42 });
}

#[test]
fn own_session_is_recognized() {
    let entry = lock_entry("svc/leader", b"node-a", &me());
    assert_eq!(
        LockObservation::of(Some(&entry), Some(&me())),
        LockObservation::OwnedBySelf
    );
}

#[test]
fn other_holder_is_reported() {
    let other = SessionId::new("other");
    let entry = lock_entry("svc/leader", b"", &other);
    let observed = LockObservation::of(Some(&entry), Some(&me()));
    assert_eq!(observed, LockObservation::OwnedByOther { holder: other });
}

#[test]
fn held_entry_without_observer_session_is_other() {
    let entry = lock_entry("svc/leader", b"", &me());
    assert!(matches!(
        LockObservation::of(Some(&entry), None),
        LockObservation::OwnedByOther { .. }
    ));
}

#[test]
fn foreign_flags_conflict() {
    let entry = KvEntry::new("svc/leader").with_flags(SEMAPHORE_FLAG_VALUE);
    assert_eq!(
        LockObservation::of(Some(&entry), Some(&me())),
        LockObservation::Conflict {
            flags: SEMAPHORE_FLAG_VALUE
        }
    );

    let plain = KvEntry::new("svc/leader");
    assert_eq!(
        LockObservation::of(Some(&plain), Some(&me())),
        LockObservation::Conflict { flags: 0 }
    );
}

#[test]
fn lock_entry_carries_tag_value_and_session() {
    let entry = lock_entry("svc/leader", b"payload", &me());
    assert_eq!(entry.flags, LOCK_FLAG_VALUE);
    assert_eq!(entry.value, b"payload".to_vec());
    assert!(entry.is_owned_by(&me()));
}
