// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvlock - hold a distributed lock or semaphore slot while a command runs

mod commands;
mod completions;
mod error;
mod primitive;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{destroy, lock};
use completions::CompletionsArgs;
use kvlock_adapters::consul::{ADDRESS_ENV, DATACENTER_ENV, TOKEN_ENV};
use kvlock_adapters::{ConsulClient, ConsulConfig, TracedKvStore, TracedSessionService};
use kvlock_engine::Coordinator;
use std::process::ExitCode;

use crate::error::CliError;

/// Environment variable holding the log filter
const LOG_ENV: &str = "KVLOCK_LOG";

#[derive(Parser)]
#[command(
    name = "kvlock",
    version,
    about = "Distributed locks and semaphores over a Consul-compatible KV store"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log more (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConnectionArgs {
    /// Address of the coordination service (host:port or URL)
    #[arg(long, global = true, env = ADDRESS_ENV)]
    address: Option<String>,

    /// ACL token sent with every request
    #[arg(long, global = true, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// Datacenter to target
    #[arg(long, global = true, env = DATACENTER_ENV)]
    datacenter: Option<String>,
}

impl ConnectionArgs {
    fn config(&self) -> ConsulConfig {
        let mut config = ConsulConfig::from_env();
        if let Some(address) = &self.address {
            config = config.with_address(address);
        }
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }
        if let Some(datacenter) = &self.datacenter {
            config = config.with_datacenter(datacenter);
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command while holding a lock (or a semaphore slot with --limit)
    Lock(lock::LockArgs),
    /// Remove a lock or semaphore nobody holds
    Destroy(destroy::DestroyArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

type ConsulCoordinator =
    Coordinator<TracedKvStore<ConsulClient>, TracedSessionService<ConsulClient>>;

fn coordinator(connection: &ConnectionArgs) -> ConsulCoordinator {
    let config = connection.config();
    tracing::debug!(address = %config.base_url(), "using coordination service");
    let client = ConsulClient::new(config);
    Coordinator::new(
        TracedKvStore::new(client.clone()),
        TracedSessionService::new(client),
    )
}

fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Completions(args) => {
            completions::generate_completions::<Cli>(args.shell);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lock(args) => lock::handle(args, coordinator(&cli.connection)).await,
        Commands::Destroy(args) => {
            destroy::handle(args, coordinator(&cli.connection)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(err) => eprint!("{}", err),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
