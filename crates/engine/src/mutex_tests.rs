// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn try_lock_fails_while_owned() {
    let mutex = CoordinationMutex::new(0u32);
    let guard = mutex.try_lock().unwrap();
    assert!(mutex.try_lock().is_none());
    drop(guard);
    assert!(mutex.try_lock().is_some());
}

#[tokio::test(start_paused = true)]
async fn waiters_get_ownership_in_turn() {
    let mutex = Arc::new(CoordinationMutex::new(Vec::new()));

    let mut first = mutex.lock().await;
    first.push(1);

    let waiter = {
        let mutex = Arc::clone(&mutex);
        tokio::spawn(async move {
            let mut guard = mutex.lock().await;
            guard.push(2);
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    drop(first);
    waiter.await.unwrap();
    assert_eq!(*mutex.lock().await, vec![1, 2]);
}

#[tokio::test]
async fn ownership_is_released_when_the_owner_is_cancelled() {
    let mutex = Arc::new(CoordinationMutex::new(()));
    let owner = {
        let mutex = Arc::clone(&mutex);
        tokio::spawn(async move {
            let _guard = mutex.lock().await;
            std::future::pending::<()>().await;
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutex.try_lock().is_none());

    owner.abort();
    let _ = owner.await;
    assert!(mutex.try_lock().is_some());
}
