// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kvlock_core::{UuidIdGen, LOCK_FLAG_VALUE};

fn lock_entry(key: &str, session: &SessionId) -> KvEntry {
    KvEntry::new(key)
        .with_value(b"v".to_vec())
        .with_flags(LOCK_FLAG_VALUE)
        .with_session(session.clone())
}

fn request(ttl_secs: u64) -> SessionRequest {
    SessionRequest::new("test").with_ttl(Duration::from_secs(ttl_secs))
}

#[tokio::test]
async fn cas_with_zero_index_only_creates() {
    let store = FakeStore::new();
    let entry = KvEntry::new("k").with_value(b"a".to_vec());
    assert!(store.cas(&entry).await.unwrap());
    assert!(!store.cas(&entry).await.unwrap());

    let current = store.entry("k").unwrap();
    let update = entry.with_value(b"b".to_vec()).with_modify_index(current.modify_index);
    assert!(store.cas(&update).await.unwrap());
    // Stale index now
    assert!(!store.cas(&update).await.unwrap());
    assert_eq!(store.entry("k").unwrap().value, b"b".to_vec());
}

#[tokio::test]
async fn acquire_is_exclusive_between_sessions() {
    let store = FakeStore::new();
    let a = store.create(&request(15)).await.unwrap();
    let b = store.create(&request(15)).await.unwrap();

    assert!(store.acquire(&lock_entry("k", &a)).await.unwrap());
    assert!(!store.acquire(&lock_entry("k", &b)).await.unwrap());
    assert!(!store.release(&lock_entry("k", &b)).await.unwrap());
    assert!(store.release(&lock_entry("k", &a)).await.unwrap());
    assert!(store.acquire(&lock_entry("k", &b)).await.unwrap());

    let entry = store.entry("k").unwrap();
    assert_eq!(entry.lock_index, 2);
    assert!(entry.is_owned_by(&b));
}

#[tokio::test]
async fn acquire_without_session_is_rejected() {
    let store = FakeStore::new();
    let err = store.acquire(&KvEntry::new("k")).await.unwrap_err();
    assert_eq!(err, KvError::MissingSession("k".to_string()));

    let unknown = lock_entry("k", &SessionId::new("nope"));
    let err = store.acquire(&unknown).await.unwrap_err();
    assert!(matches!(err, KvError::Status { status: 500, .. }));
}

#[tokio::test]
async fn invalid_keys_are_rejected() {
    let store = FakeStore::new();
    let err = store.get("/k", &QueryOptions::new()).await.unwrap_err();
    assert!(matches!(err, KvError::InvalidKey(_)));
}

#[tokio::test]
async fn list_returns_only_prefixed_keys() {
    let store = FakeStore::new();
    for key in ["a/1", "a/2", "ab", "b/1"] {
        store.put(&KvEntry::new(key)).await.unwrap();
    }
    let listed = store.list("a/", &QueryOptions::new()).await.unwrap();
    let keys: Vec<&str> = listed.value.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["a/1", "a/2"]);
}

#[tokio::test(start_paused = true)]
async fn blocking_get_wakes_on_write() {
    let store = FakeStore::new();
    store.put(&KvEntry::new("k")).await.unwrap();
    let first = store.get("k", &QueryOptions::new()).await.unwrap();

    let reader = store.clone();
    let index = first.last_index;
    let handle = tokio::spawn(async move {
        let mut opts = QueryOptions::blocking(Duration::from_secs(60));
        opts.wait_index = index;
        reader.get("k", &opts).await
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!handle.is_finished());

    store
        .put(&KvEntry::new("k").with_value(b"new".to_vec()))
        .await
        .unwrap();
    let response = handle.await.unwrap().unwrap();
    assert!(response.last_index > index);
    assert_eq!(response.value.unwrap().value, b"new".to_vec());
}

#[tokio::test(start_paused = true)]
async fn blocking_get_returns_after_wait_time() {
    let store = FakeStore::new();
    let first = store.get("k", &QueryOptions::new()).await.unwrap();
    let start = Instant::now();
    let mut opts = QueryOptions::blocking(Duration::from_secs(5));
    opts.wait_index = first.last_index;
    let response = store.get("k", &opts).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(response.last_index, first.last_index);
    assert!(response.value.is_none());
}

#[tokio::test(start_paused = true)]
async fn expired_session_deletes_owned_keys() {
    let store = FakeStore::new();
    let id = store
        .create(&request(10).with_behavior(SessionBehavior::Delete))
        .await
        .unwrap();
    assert!(store.acquire(&lock_entry("k", &id)).await.unwrap());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!store.session_exists(&id));
    assert!(store.entry("k").is_none());
}

#[tokio::test(start_paused = true)]
async fn invalidation_with_release_applies_lock_delay() {
    let store = FakeStore::new();
    let a = store
        .create(&request(15).with_lock_delay(Duration::from_secs(3)))
        .await
        .unwrap();
    let b = store.create(&request(15)).await.unwrap();
    assert!(store.acquire(&lock_entry("k", &a)).await.unwrap());

    assert!(store.invalidate_session(&a));
    let entry = store.entry("k").unwrap();
    assert!(!entry.is_owned());
    assert_eq!(entry.value, b"v".to_vec());

    assert!(!store.acquire(&lock_entry("k", &b)).await.unwrap());
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(store.acquire(&lock_entry("k", &b)).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn renew_extends_session_and_reports_expiry() {
    let store = FakeStore::new();
    let id = store.create(&request(10)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(store.renew(&id).await.unwrap(), Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert!(store.session_exists(&id));

    store.destroy(&id).await.unwrap();
    assert_eq!(
        store.renew(&id).await.unwrap_err(),
        SessionError::Expired(id.clone())
    );
}

#[tokio::test]
async fn injected_failures_are_transient() {
    let store = FakeStore::new();
    store.fail_reads(1);
    let err = store.get("k", &QueryOptions::new()).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(store.get("k", &QueryOptions::new()).await.is_ok());

    let id = store.create(&request(10)).await.unwrap();
    store.fail_renewals(1);
    assert!(matches!(
        store.renew(&id).await,
        Err(SessionError::Unavailable(_))
    ));
    assert!(store.renew(&id).await.is_ok());
}

#[tokio::test]
async fn delete_cas_requires_matching_index() {
    let store = FakeStore::new();
    store.put(&KvEntry::new("k")).await.unwrap();
    let current = store.entry("k").unwrap();
    assert!(!store
        .delete_cas(&KvEntry::new("k").with_modify_index(current.modify_index + 1))
        .await
        .unwrap());
    assert!(store.delete_cas(&current).await.unwrap());
    assert!(store.entry("k").is_none());
}

#[tokio::test]
async fn records_calls() {
    let store = FakeStore::with_id_gen(UuidIdGen);
    let id = store.create(&request(10)).await.unwrap();
    store.delete("k").await.unwrap();
    store.destroy(&id).await.unwrap();
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::CreateSession {
                name: "test".to_string()
            },
            StoreCall::Delete {
                key: "k".to_string()
            },
            StoreCall::DestroySession { id },
        ]
    );
}
