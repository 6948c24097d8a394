// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kvlock_adapters::{FakeStore, StoreCall};
use kvlock_core::SessionRequest;

async fn session(store: &FakeStore, ttl: Duration) -> SessionId {
    store
        .create(&SessionRequest::new("test").with_ttl(ttl))
        .await
        .unwrap()
}

fn renewals(store: &FakeStore) -> usize {
    store
        .calls()
        .iter()
        .filter(|c| matches!(c, StoreCall::RenewSession { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn renews_at_half_ttl_and_destroys_on_stop() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    let stop = CancellationToken::new();

    let task = {
        let (store, id, stop) = (store.clone(), id.clone(), stop.clone());
        tokio::spawn(async move { renew_periodic(&store, &id, Duration::from_secs(10), &stop).await })
    };

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(renewals(&store), 6);
    assert!(store.session_exists(&id));

    stop.cancel();
    task.await.unwrap().unwrap();
    assert!(!store.session_exists(&id));
    assert!(matches!(
        store.calls().last(),
        Some(StoreCall::DestroySession { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn externally_destroyed_session_fails_with_expired() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    store.invalidate_session(&id);

    let err = renew_periodic(&store, &id, Duration::from_secs(10), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::SessionExpired(ref lost) if *lost == id));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_quickly() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    store.fail_renewals(2);
    let stop = CancellationToken::new();

    let task = {
        let (store, id, stop) = (store.clone(), id.clone(), stop.clone());
        tokio::spawn(async move { renew_periodic(&store, &id, Duration::from_secs(10), &stop).await })
    };

    // Renewal at 5s fails, retries at 6s and 7s, the last one succeeds
    tokio::time::sleep(Duration::from_millis(7500)).await;
    assert_eq!(renewals(&store), 3);
    assert!(!task.is_finished());
    assert!(store.session_exists(&id));

    stop.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn gives_up_when_no_renewal_succeeds_within_ttl() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    store.fail_renewals(u32::MAX);

    let start = Instant::now();
    let err = renew_periodic(&store, &id, Duration::from_secs(10), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinationError::SessionExpired(_)));
    assert!(start.elapsed() > Duration::from_secs(10));
    assert!(start.elapsed() <= Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn keepalive_failure_cancels_lost_signal() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    let lost = CancellationToken::new();
    let keepalive = KeepAlive::spawn(store.clone(), id.clone(), Duration::from_secs(10), &lost);

    store.invalidate_session(&id);
    tokio::time::timeout(Duration::from_secs(6), lost.cancelled())
        .await
        .unwrap();
    assert!(matches!(
        keepalive.stop().await,
        Err(CoordinationError::SessionExpired(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn cancelling_lost_stops_keepalive() {
    let store = FakeStore::new();
    let id = session(&store, Duration::from_secs(10)).await;
    let lost = CancellationToken::new();
    let keepalive = KeepAlive::spawn(store.clone(), id.clone(), Duration::from_secs(10), &lost);

    lost.cancel();
    keepalive.stop().await.unwrap();
    assert!(!store.session_exists(&id));
}
