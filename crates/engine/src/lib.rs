// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ebb - An offline mutation queue and sync engine.
//!
//! This crate provides the engine behind the `ebb` CLI: local mutations are
//! queued durably with a vector clock and replayed against a remote service
//! once the network is back.
//!
//! # Main Components
//!
//! - [`Engine`] - One data directory's store, queue, resolver and monitor
//! - [`queue::QueueManager`] - Durable queue with ordering, retries and maintenance
//! - [`sync::Coordinator`] - Replay cycles with backoff, rate limiting and a circuit breaker
//! - [`conflict::ConflictResolver`] - Concurrent-edit detection and resolution
//! - [`network::NetworkMonitor`] - Connectivity and link quality
//! - [`Config`] - Per-directory configuration (`config.toml`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use ebb::{Engine, Action};
//!
//! let engine = Engine::open(Path::new("/var/lib/ebb"))?;
//! engine.queue().enqueue("todo", "todo-1", Action::Create, &json!({"title": "A"}))?;
//!
//! let coordinator = engine.coordinator(engine.websocket_remote()?);
//! let report = coordinator.run_cycle().await?;
//! ```

mod cli;
pub mod colors;
mod commands;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod help;
pub mod network;
pub mod queue;
pub mod status;
pub mod sync;
#[cfg(test)]
mod test_helpers;

pub use cli::{ActionArg, Cli, Command, OutputFormat, StatusArg};
pub use config::{init_data_dir, resolve_data_dir, Config, RemoteConfig};
pub use conflict::{Choice, Conflict, ConflictResolver};
pub use ebb_core::{Action, Record, Status, VectorClock};
pub use engine::Engine;
pub use error::{Error, Result};
pub use status::SyncStatus;

use clap::CommandFactory;
use clap_complete::generate;

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let dir = cli.dir.as_deref();
    match cli.command {
        Command::Enqueue { resource_type, resource_id, action, payload, output } => {
            commands::enqueue::run(
                dir,
                &resource_type,
                &resource_id,
                action.into(),
                payload.as_deref(),
                output,
            )
        }
        Command::List { status, corrupted, output } => {
            let status: Vec<Status> = status.into_iter().map(Status::from).collect();
            commands::list::run(dir, &status, corrupted, output)
        }
        Command::Show { id, output } => commands::show::run(dir, &id, output),
        Command::Retry { ids, all } => commands::maintenance::retry(dir, &ids, all),
        Command::Compact => commands::maintenance::compact(dir),
        Command::ClearFailed => commands::maintenance::clear_failed(dir),
        Command::Discard { id } => commands::maintenance::discard(dir, &id),
        Command::Status { output } => commands::status::run(dir, output),
        Command::Sync { force, output } => commands::sync::run(dir, force, output),
        Command::Run { probe_interval } => commands::sync::run_loop(dir, probe_interval),
        Command::Conflicts { output } => commands::conflicts::list(dir, output),
        Command::Resolve { id, choice } => commands::conflicts::resolve(dir, &id, &choice),
        Command::Init { device_id, remote, token } => {
            commands::init::run(dir, device_id, remote, token)
        }
        Command::Export { file } => commands::export::run(dir, file.as_deref()),
        Command::Import { file } => commands::import::run(dir, &file),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ebb", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
