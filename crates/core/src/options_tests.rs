// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn lock_defaults() {
    let opts = LockOptions::new("svc/leader");
    assert_eq!(opts.wait_time, Duration::from_secs(15));
    assert_eq!(opts.retry_time, Duration::from_secs(5));
    assert_eq!(opts.monitor_retries, 0);
    assert_eq!(opts.monitor_retry_time, Duration::from_secs(2));
    assert!(!opts.try_once);
    match &opts.session {
        SessionPolicy::Create(request) => {
            assert_eq!(request.name, "kvlock lock");
            assert_eq!(request.ttl, Duration::from_secs(15));
            assert_eq!(request.behavior, SessionBehavior::Release);
        }
        other => panic!("expected created session, got {other:?}"),
    }
    assert!(opts.validate().is_ok());
}

#[test]
fn session_builders_replace_existing_session() {
    let opts = LockOptions::new("k")
        .with_session(SessionId::new("abc"))
        .with_session_ttl(Duration::from_secs(30))
        .with_session_behavior(SessionBehavior::Delete);
    assert_eq!(
        opts.session,
        SessionPolicy::Create(
            SessionRequest::new("kvlock lock")
                .with_ttl(Duration::from_secs(30))
                .with_behavior(SessionBehavior::Delete)
        )
    );

    let existing = LockOptions::new("k")
        .with_session_name("worker")
        .with_session(SessionId::new("abc"));
    assert_eq!(existing.session, SessionPolicy::Existing(SessionId::new("abc")));
}

#[test]
fn lock_options_from_json() {
    let json = r#"{
        "key": "svc/leader",
        "wait_time": "2s",
        "try_once": true,
        "monitor_retries": 3,
        "session": { "create": { "name": "web", "ttl": "30s", "behavior": "delete" } }
    }"#;
    let opts: LockOptions = serde_json::from_str(json).unwrap();
    assert_eq!(opts.key, "svc/leader");
    assert_eq!(opts.wait_time, Duration::from_secs(2));
    assert_eq!(opts.retry_time, Duration::from_secs(5));
    assert!(opts.try_once);
    assert_eq!(opts.monitor_retries, 3);
    assert_eq!(
        opts.session,
        SessionPolicy::Create(
            SessionRequest::new("web")
                .with_ttl(Duration::from_secs(30))
                .with_behavior(SessionBehavior::Delete)
        )
    );
}

#[test]
fn semaphore_options_from_json_with_existing_session() {
    let json = r#"{ "prefix": "svc/workers", "limit": 3, "session": { "existing": "abc" } }"#;
    let opts: SemaphoreOptions = serde_json::from_str(json).unwrap();
    assert_eq!(opts.limit, 3);
    assert_eq!(opts.session, SessionPolicy::Existing(SessionId::new("abc")));
    assert_eq!(opts.wait_time, Duration::from_secs(15));
}

#[parameterized(
    empty_key = { LockOptions::new(""), OptionsError::InvalidKey(KeyError::Empty) },
    leading_slash = { LockOptions::new("/x"), OptionsError::InvalidKey(KeyError::LeadingSlash("/x".into())) },
    zero_wait = { LockOptions::new("x").with_wait_time(Duration::ZERO), OptionsError::ZeroWaitTime },
    zero_ttl = { LockOptions::new("x").with_session_ttl(Duration::ZERO), OptionsError::ZeroTtl },
)]
fn invalid_lock_options(opts: LockOptions, expected: OptionsError) {
    assert_eq!(opts.validate(), Err(expected));
}

#[parameterized(
    zero_limit = { SemaphoreOptions::new("x", 0), OptionsError::ZeroLimit },
    empty_prefix = { SemaphoreOptions::new("", 2), OptionsError::InvalidKey(KeyError::Empty) },
    zero_wait = { SemaphoreOptions::new("x", 2).with_wait_time(Duration::ZERO), OptionsError::ZeroWaitTime },
)]
fn invalid_semaphore_options(opts: SemaphoreOptions, expected: OptionsError) {
    assert_eq!(opts.validate(), Err(expected));
}

#[test]
fn existing_session_skips_ttl_check() {
    let opts = SemaphoreOptions::new("x", 2).with_session(SessionId::new("abc"));
    assert!(opts.validate().is_ok());
}
