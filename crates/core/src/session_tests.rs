// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn request_defaults_to_release_behavior() {
    let request = SessionRequest::new("worker");
    assert_eq!(request.behavior, SessionBehavior::Release);
    assert_eq!(request.ttl, DEFAULT_SESSION_TTL);
    assert!(request.lock_delay.is_none());
}

#[test]
fn request_parses_humantime_durations() {
    let request: SessionRequest = serde_json::from_str(
        r#"{"name": "batch", "ttl": "30s", "behavior": "delete", "lock_delay": "1s"}"#,
    )
    .unwrap();

    assert_eq!(request.ttl, Duration::from_secs(30));
    assert_eq!(request.behavior, SessionBehavior::Delete);
    assert_eq!(request.lock_delay, Some(Duration::from_secs(1)));
}

#[test]
fn session_id_serializes_as_plain_string() {
    let id = SessionId::new("4ca8e74b-6350-7587-addf-a18084928f3c");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"4ca8e74b-6350-7587-addf-a18084928f3c\"");
    assert_eq!(id.to_string(), "4ca8e74b-6350-7587-addf-a18084928f3c");
}
