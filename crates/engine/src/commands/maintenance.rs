// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Host-driven record upkeep: retry, compact, clear-failed, discard.

use std::path::Path;

use ebb_core::Status;

use crate::engine::Engine;
use crate::error::Result;

use super::open_engine;

pub fn retry(dir: Option<&Path>, ids: &[String], all: bool) -> Result<()> {
    let engine = open_engine(dir)?;
    let retried = retry_impl(&engine, ids, all)?;
    println!("Retrying {} record{}", retried.len(), if retried.len() == 1 { "" } else { "s" });
    Ok(())
}

/// Returns the named failed records (or all of them) to `pending`.
///
/// Stops at the first id that is unknown or not failed.
pub(crate) fn retry_impl(engine: &Engine, ids: &[String], all: bool) -> Result<Vec<String>> {
    let queue = engine.queue();
    let targets: Vec<String> = if all {
        queue.list()?.into_iter().filter(|r| r.status == Status::Failed).map(|r| r.id).collect()
    } else {
        ids.to_vec()
    };
    for id in &targets {
        queue.retry(id)?;
    }
    Ok(targets)
}

pub fn compact(dir: Option<&Path>) -> Result<()> {
    let engine = open_engine(dir)?;
    let removed = engine.queue().compact()?;
    println!("Removed {removed} completed records");
    Ok(())
}

pub fn clear_failed(dir: Option<&Path>) -> Result<()> {
    let engine = open_engine(dir)?;
    let removed = engine.queue().clear_failed()?;
    println!("Removed {removed} failed records");
    Ok(())
}

pub fn discard(dir: Option<&Path>, id: &str) -> Result<()> {
    let engine = open_engine(dir)?;
    engine.queue().discard_corrupted(id)?;
    println!("Discarded {id}");
    Ok(())
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
