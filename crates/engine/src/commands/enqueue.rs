// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;
use std::path::Path;

use serde_json::Value;

use ebb_core::Action;

use crate::cli::OutputFormat;
use crate::engine::Engine;
use crate::error::{Error, Result};

use super::{open_engine, print_json};

pub fn run(
    dir: Option<&Path>,
    resource_type: &str,
    resource_id: &str,
    action: Action,
    payload: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let payload = parse_payload(payload, std::io::stdin().lock())?;
    let engine = open_engine(dir)?;
    run_impl(&engine, resource_type, resource_id, action, &payload, output)?;
    Ok(())
}

/// Internal implementation that accepts the engine for testing.
pub(crate) fn run_impl(
    engine: &Engine,
    resource_type: &str,
    resource_id: &str,
    action: Action,
    payload: &Value,
    output: OutputFormat,
) -> Result<String> {
    let queue = engine.queue();
    let id = queue.enqueue(resource_type, resource_id, action, payload)?;
    match output {
        OutputFormat::Text => println!("{id}"),
        OutputFormat::Json => print_json(&queue.get(&id)?)?,
    }
    Ok(id)
}

/// Reads the payload argument: absent means `{}`, `-` means stdin.
pub(crate) fn parse_payload(arg: Option<&str>, mut stdin: impl Read) -> Result<Value> {
    let text = match arg {
        None => return Ok(Value::Object(serde_json::Map::new())),
        Some("-") => {
            let mut buf = String::new();
            stdin.read_to_string(&mut buf)?;
            buf
        }
        Some(text) => text.to_string(),
    };
    serde_json::from_str(text.trim()).map_err(|e| Error::InvalidPayload(e.to_string()))
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
