// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::str::FromStr;

use crate::cli::OutputFormat;
use crate::conflict::{Choice, Conflict};
use crate::engine::Engine;
use crate::error::Result;

use super::{open_engine, print_json};

pub fn list(dir: Option<&Path>, output: OutputFormat) -> Result<()> {
    let engine = open_engine(dir)?;
    list_impl(&engine, output)
}

pub(crate) fn list_impl(engine: &Engine, output: OutputFormat) -> Result<()> {
    let conflicts = engine.resolver().pending();
    match output {
        OutputFormat::Json => print_json(&conflicts),
        OutputFormat::Text => {
            if conflicts.is_empty() {
                println!("No conflicts");
            }
            for conflict in &conflicts {
                println!("{}", format_conflict(conflict));
            }
            Ok(())
        }
    }
}

pub fn resolve(dir: Option<&Path>, id: &str, choice: &str) -> Result<()> {
    let choice = Choice::from_str(choice)?;
    let engine = open_engine(dir)?;
    resolve_impl(&engine, id, choice)
}

pub(crate) fn resolve_impl(engine: &Engine, id: &str, choice: Choice) -> Result<()> {
    let record = engine.resolve(id, choice)?;
    println!("Resolved {} keeping {} ({} queued for replay)", record.id, choice, record.action);
    Ok(())
}

pub(crate) fn format_conflict(conflict: &Conflict) -> String {
    format!(
        "{}  {} {}  detected {}\n  local:  {}  [{}]\n  remote: {}  [{}]",
        conflict.operation_id,
        conflict.kind.action,
        conflict.resource_key(),
        conflict.detected_at.to_rfc3339(),
        conflict.local.payload,
        conflict.local.clock,
        conflict.remote.payload,
        conflict.remote.clock,
    )
}

#[cfg(test)]
#[path = "conflicts_tests.rs"]
mod tests;
