// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "service/leader" },
    single_segment = { "leader" },
    trailing_slash = { "service/" },
)]
fn valid_keys_pass(key: &str) {
    assert!(validate_key(key).is_ok());
}

#[test]
fn empty_key_rejected() {
    assert_eq!(validate_key(""), Err(KeyError::Empty));
}

#[test]
fn leading_slash_rejected() {
    assert_eq!(
        validate_key("/service/leader"),
        Err(KeyError::LeadingSlash("/service/leader".to_string()))
    );
}

#[test]
fn ownership_checks() {
    let me = SessionId::new("me");
    let entry = KvEntry::new("k").with_session(me.clone());
    assert!(entry.is_owned());
    assert!(entry.is_owned_by(&me));
    assert!(!entry.is_owned_by(&SessionId::new("other")));

    let unowned = KvEntry::new("k");
    assert!(!unowned.is_owned());

    let blank = KvEntry::new("k").with_session(SessionId::new(""));
    assert!(!blank.is_owned());
}

#[test]
fn zero_index_never_blocks() {
    let mut query = QueryOptions::blocking(Duration::from_secs(15));
    assert!(!query.is_blocking());
    query.wait_index = 7;
    assert!(query.is_blocking());

    let mut no_wait = QueryOptions::new();
    no_wait.wait_index = 7;
    assert!(!no_wait.is_blocking());
}
