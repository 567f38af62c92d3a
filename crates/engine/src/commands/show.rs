// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use ebb_core::Record;

use crate::cli::OutputFormat;
use crate::engine::Engine;
use crate::error::Result;

use super::{open_engine, print_json};

pub fn run(dir: Option<&Path>, id: &str, output: OutputFormat) -> Result<()> {
    let engine = open_engine(dir)?;
    run_impl(&engine, id, output)
}

/// Internal implementation that accepts the engine for testing.
pub(crate) fn run_impl(engine: &Engine, id: &str, output: OutputFormat) -> Result<()> {
    let record = engine.queue().get(id)?;
    match output {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            let parked = engine.resolver().is_parked(id);
            println!("{}", format_details(&record, parked));
            Ok(())
        }
    }
}

pub(crate) fn format_details(record: &Record, parked: bool) -> String {
    let mut lines = vec![
        format!("id:        {}", record.id),
        format!("resource:  {}", record.resource_key()),
        format!("action:    {}", record.action),
        format!("status:    {}{}", record.status, if parked { " (conflict)" } else { "" }),
        format!("priority:  {}", record.priority),
        format!("clock:     {}", record.clock),
        format!("created:   {}", record.created_at.to_rfc3339()),
    ];
    if record.retry_count > 0 {
        lines.push(format!("retries:   {}", record.retry_count));
    }
    if let Some(at) = record.next_attempt_at {
        lines.push(format!("next try:  {}", at.to_rfc3339()));
    }
    if let Some(at) = record.completed_at {
        lines.push(format!("completed: {}", at.to_rfc3339()));
    }
    if let Some(ms) = record.processing_time_ms {
        lines.push(format!("took:      {ms}ms"));
    }
    if let Some(error) = &record.error {
        lines.push(format!("error:     {error}"));
    }
    lines.push(format!("payload:   {}", record.payload));
    lines.join("\n")
}

#[cfg(test)]
#[path = "show_tests.rs"]
mod tests;
