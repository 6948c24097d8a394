// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destroy command: remove an unheld lock or semaphore from the store

use crate::error::CliError;
use crate::primitive::{lock_key, Kind, Primitive};
use anyhow::Result;
use kvlock_adapters::{KvStore, SessionService};
use kvlock_core::{LockOptions, SemaphoreOptions};
use kvlock_engine::Coordinator;

#[derive(clap::Args)]
pub struct DestroyArgs {
    /// Destroy a semaphore instead of a lock
    #[arg(long)]
    pub semaphore: bool,

    /// KV prefix the lock or semaphore lives under
    pub prefix: String,
}

impl DestroyArgs {
    pub fn kind(&self) -> Kind {
        if self.semaphore {
            Kind::Semaphore
        } else {
            Kind::Lock
        }
    }
}

pub async fn handle<K: KvStore, S: SessionService>(
    args: DestroyArgs,
    coordinator: Coordinator<K, S>,
) -> Result<()> {
    let kind = args.kind();
    destroy(&args, &coordinator)
        .await
        .map_err(|e| CliError::destroy_failed(kind, &args.prefix, e))?;
    println!("Destroyed {kind} '{}'", args.prefix);
    Ok(())
}

async fn destroy<K: KvStore, S: SessionService>(
    args: &DestroyArgs,
    coordinator: &Coordinator<K, S>,
) -> Result<(), kvlock_engine::CoordinationError> {
    let primitive = match args.kind() {
        Kind::Lock => Primitive::lock(coordinator, LockOptions::new(lock_key(&args.prefix)))?,
        // Destroy never compares limits, any valid one will do
        Kind::Semaphore => {
            Primitive::semaphore(coordinator, SemaphoreOptions::new(&args.prefix, 1))?
        }
    };
    primitive.destroy().await
}

#[cfg(test)]
#[path = "destroy_tests.rs"]
mod tests;
