// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;
use kvlock_adapters::FakeStore;
use kvlock_core::{KvEntry, SEMAPHORE_FLAG_VALUE};

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    args: LockArgs,
}

fn parse(argv: &[&str]) -> LockArgs {
    let argv = std::iter::once("kvlock-lock").chain(argv.iter().copied());
    TestCli::try_parse_from(argv).unwrap().args
}

fn coordinator() -> (FakeStore, Coordinator<FakeStore, FakeStore>) {
    let store = FakeStore::new();
    (store.clone(), Coordinator::with_client(store))
}

fn command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn trailing_command_keeps_its_flags() {
    let args = parse(&["jobs/nightly", "sh", "-c", "exit 3"]);
    assert_eq!(args.prefix, "jobs/nightly");
    assert_eq!(args.command, vec!["sh", "-c", "exit 3"]);
    assert_eq!(args.limit, 1);
    assert_eq!(args.kind(), Kind::Lock);
}

#[test]
fn zero_limit_is_rejected() {
    let argv = ["kvlock-lock", "--limit", "0", "jobs", "true"];
    assert!(TestCli::try_parse_from(argv).is_err());
}

#[test]
fn command_is_required() {
    assert!(TestCli::try_parse_from(["kvlock-lock", "jobs"]).is_err());
}

#[test]
fn limit_one_builds_lock_under_prefix() {
    let (_, coordinator) = coordinator();
    let args = parse(&[
        "--try", "10s", "--ttl", "30s", "--name", "nightly", "--monitor-retry", "2", "jobs/",
        "true",
    ]);
    let Primitive::Lock(lock) = args.primitive(&coordinator).unwrap() else {
        panic!("expected a lock");
    };
    assert_eq!(lock.key(), "jobs/.lock");
    let opts = lock.options();
    assert!(opts.try_once);
    assert_eq!(opts.wait_time, Duration::from_secs(10));
    assert_eq!(opts.monitor_retries, 2);
    let kvlock_core::SessionPolicy::Create(request) = &opts.session else {
        panic!("expected a created session");
    };
    assert_eq!(request.name, "nightly");
    assert_eq!(request.ttl, Duration::from_secs(30));
}

#[test]
fn larger_limit_builds_semaphore() {
    let (_, coordinator) = coordinator();
    let args = parse(&["-n", "3", "jobs", "true"]);
    assert_eq!(args.kind(), Kind::Semaphore);
    let Primitive::Semaphore(semaphore) = args.primitive(&coordinator).unwrap() else {
        panic!("expected a semaphore");
    };
    assert_eq!(semaphore.prefix(), "jobs");
    assert_eq!(semaphore.limit(), 3);
    assert!(!semaphore.options().try_once);
}

#[test]
fn exit_codes() {
    assert_eq!(Outcome::Exited(0).exit_code(), ExitCode::SUCCESS);
    assert_eq!(Outcome::Exited(3).exit_code(), ExitCode::from(3));
    assert_eq!(Outcome::Exited(-1).exit_code(), ExitCode::FAILURE);
    assert_eq!(Outcome::Lost.exit_code(), ExitCode::FAILURE);
    assert_eq!(Outcome::Interrupted.exit_code(), ExitCode::from(130));
}

#[tokio::test]
async fn command_runs_while_held_and_lock_is_released() {
    let (store, coordinator) = coordinator();
    let primitive = parse(&["jobs", "true"]).primitive(&coordinator).unwrap();

    let outcome = hold(
        &primitive,
        "jobs",
        &command(&["sh", "-c", "exit 3"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, Outcome::Exited(3));
    let entry = store.entry("jobs/.lock").unwrap();
    assert!(!entry.is_owned());
    assert_eq!(store.session_count(), 0);
}

#[tokio::test]
async fn lost_lock_stops_command() {
    let (store, coordinator) = coordinator();
    let primitive = parse(&["jobs", "true"]).primitive(&coordinator).unwrap();

    let invalidate = {
        let store = store.clone();
        tokio::spawn(async move {
            loop {
                let holder = store.entry("jobs/.lock").and_then(|e| e.session);
                if let Some(session) = holder {
                    store.invalidate_session(&session);
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        hold(
            &primitive,
            "jobs",
            &command(&["sleep", "30"]),
            &CancellationToken::new(),
        ),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(outcome, Outcome::Lost);
    invalidate.await.unwrap();
}

#[tokio::test]
async fn interrupted_before_acquire_runs_nothing() {
    let (store, coordinator) = coordinator();
    let primitive = parse(&["jobs", "true"]).primitive(&coordinator).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = hold(&primitive, "jobs", &command(&["true"]), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Interrupted);
    assert!(store.entry("jobs/.lock").is_none());
}

#[tokio::test]
async fn conflicting_key_fails_with_suggestions() {
    let (store, coordinator) = coordinator();
    store.insert(KvEntry::new("jobs/.lock").with_flags(SEMAPHORE_FLAG_VALUE));
    let primitive = parse(&["jobs", "true"]).primitive(&coordinator).unwrap();

    let err = hold(&primitive, "jobs", &command(&["true"]), &CancellationToken::new())
        .await
        .unwrap_err();
    let err = err.downcast::<CliError>().unwrap();
    assert!(err.message.contains("Failed to acquire lock 'jobs'"));
    assert!(!err.suggestions.is_empty());
}

#[tokio::test]
async fn missing_program_is_reported() {
    let (store, coordinator) = coordinator();
    let primitive = parse(&["jobs", "true"]).primitive(&coordinator).unwrap();

    let err = hold(
        &primitive,
        "jobs",
        &command(&["kvlock-definitely-missing-program"]),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("kvlock-definitely-missing-program"));
    assert!(store.entry("jobs/.lock").is_some_and(|e| !e.is_owned()));
}
