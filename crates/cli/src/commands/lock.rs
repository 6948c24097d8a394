// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock command: run a child process while holding a lock or semaphore slot

use crate::error::CliError;
use crate::primitive::{lock_key, Kind, Primitive};
use anyhow::Result;
use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::constants::DEFAULT_MONITOR_RETRY_TIME;
use kvlock_core::{LockOptions, SemaphoreOptions};
use kvlock_engine::{CancellationToken, CoordinationError, Coordinator};
use std::process::ExitCode;
use std::time::Duration;
use tokio::process::Command;

/// Exit status used when interrupted, as shells report SIGINT
const INTERRUPTED_EXIT: u8 = 130;

#[derive(clap::Args)]
pub struct LockArgs {
    /// Number of concurrent holders (1 takes a lock, more a semaphore)
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Name of the session created for this holder
    #[arg(long)]
    pub name: Option<String>,

    /// Session TTL (e.g. "15s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub ttl: Option<Duration>,

    /// Give up if not acquired within this duration (e.g. "10s")
    #[arg(long = "try", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub try_for: Option<Duration>,

    /// Transient read failures tolerated while holding
    #[arg(long, default_value_t = 0)]
    pub monitor_retry: u32,

    /// KV prefix the lock or semaphore lives under
    pub prefix: String,

    /// Command to run, with its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl LockArgs {
    pub fn kind(&self) -> Kind {
        if self.limit > 1 {
            Kind::Semaphore
        } else {
            Kind::Lock
        }
    }

    /// Build the primitive these arguments describe
    pub fn primitive<K: KvStore, S: SessionService>(
        &self,
        coordinator: &Coordinator<K, S>,
    ) -> Result<Primitive<K, S>, CoordinationError> {
        match self.kind() {
            Kind::Lock => {
                let mut opts = LockOptions::new(lock_key(&self.prefix))
                    .with_monitor_retries(self.monitor_retry, DEFAULT_MONITOR_RETRY_TIME);
                if let Some(name) = &self.name {
                    opts = opts.with_session_name(name);
                }
                if let Some(ttl) = self.ttl {
                    opts = opts.with_session_ttl(ttl);
                }
                if let Some(wait) = self.try_for {
                    opts = opts.with_wait_time(wait).with_try_once(true);
                }
                Primitive::lock(coordinator, opts)
            }
            Kind::Semaphore => {
                let mut opts = SemaphoreOptions::new(&self.prefix, self.limit)
                    .with_monitor_retries(self.monitor_retry, DEFAULT_MONITOR_RETRY_TIME);
                if let Some(name) = &self.name {
                    opts = opts.with_session_name(name);
                }
                if let Some(ttl) = self.ttl {
                    opts = opts.with_session_ttl(ttl);
                }
                if let Some(wait) = self.try_for {
                    opts = opts.with_wait_time(wait).with_try_once(true);
                }
                Primitive::semaphore(coordinator, opts)
            }
        }
    }
}

/// How the held command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command exited on its own with this status
    Exited(i32),
    /// Ownership was lost and the command was killed
    Lost,
    /// Interrupted before or while running the command
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Exited(code) => u8::try_from(code)
                .map(ExitCode::from)
                .unwrap_or(ExitCode::FAILURE),
            Outcome::Lost => ExitCode::FAILURE,
            Outcome::Interrupted => ExitCode::from(INTERRUPTED_EXIT),
        }
    }
}

pub async fn handle<K: KvStore, S: SessionService>(
    args: LockArgs,
    coordinator: Coordinator<K, S>,
) -> Result<ExitCode> {
    let primitive = args
        .primitive(&coordinator)
        .map_err(|e| CliError::acquire_failed(args.kind(), &args.prefix, e))?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let signals = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted");
            interrupt.cancel();
        }
    });

    let outcome = hold(&primitive, &args.prefix, &args.command, &cancel).await;
    signals.abort();
    Ok(outcome?.exit_code())
}

/// Acquire, run `command` until it exits or ownership ends, then release
pub async fn hold<K: KvStore, S: SessionService>(
    primitive: &Primitive<K, S>,
    prefix: &str,
    command: &[String],
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let Some((program, program_args)) = command.split_first() else {
        return Err(CliError::new("No command given").into());
    };
    let kind = primitive.kind();

    let lost = match primitive.acquire(cancel).await {
        Ok(lost) => lost,
        Err(e) if e.is_cancelled() => return Ok(Outcome::Interrupted),
        Err(e) => return Err(CliError::acquire_failed(kind, prefix, e).into()),
    };
    tracing::info!(%kind, prefix, program = %program, "running command");

    let outcome = run_child(program, program_args, &lost, cancel).await;
    match primitive.release().await {
        Ok(()) => {}
        Err(CoordinationError::NotHeld) => tracing::debug!(%kind, prefix, "already released"),
        Err(e) => tracing::warn!(%kind, prefix, error = %e, "failed to release"),
    }

    let outcome = outcome?;
    if outcome == Outcome::Lost {
        eprintln!("kvlock: lost the {kind} on '{prefix}', command was stopped");
    }
    Ok(outcome)
}

async fn run_child(
    program: &str,
    args: &[String],
    lost: &CancellationToken,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CliError::spawn_failed(program, e))?;

    let outcome = tokio::select! {
        status = child.wait() => return Ok(Outcome::Exited(status?.code().unwrap_or(1))),
        _ = lost.cancelled() => Outcome::Lost,
        _ = cancel.cancelled() => Outcome::Interrupted,
    };
    tracing::debug!(program, outcome = ?outcome, "stopping command");
    child.kill().await?;
    Ok(outcome)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
