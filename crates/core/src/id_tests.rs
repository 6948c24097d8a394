// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_ids_are_unique_and_uuid_shaped() {
    let id_gen = UuidIdGen;
    let a = id_gen.next_id();
    let b = id_gen.next_id();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn sequential_ids_share_a_counter_across_clones() {
    let id_gen = SequentialIdGen::new("s");
    let clone = id_gen.clone();
    assert_eq!(id_gen.next_id(), SessionId::new("s-1"));
    assert_eq!(clone.next_id(), SessionId::new("s-2"));
    assert_eq!(id_gen.next_id(), SessionId::new("s-3"));
}
