// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod conflicts;
pub mod enqueue;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod maintenance;
pub mod show;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::Path;

use serde::Serialize;

use crate::config::resolve_data_dir;
use crate::engine::Engine;
use crate::error::{Error, Result};

/// Opens the engine for the data directory selected by `--dir` or the
/// environment.
pub fn open_engine(dir: Option<&Path>) -> Result<Engine> {
    let data_dir = resolve_data_dir(dir)?;
    Engine::open(&data_dir)
}

/// Prints a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runtime for the commands that talk to the remote.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(format!("tokio: {}", e))))
}
