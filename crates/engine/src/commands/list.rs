// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use ebb_core::{Record, Status};

use crate::cli::OutputFormat;
use crate::colors;
use crate::engine::Engine;
use crate::error::Result;
use crate::queue::Corrupted;

use super::{open_engine, print_json};

/// Width of the status column.
const STATUS_WIDTH: usize = 10;

pub fn run(dir: Option<&Path>, status: &[Status], corrupted: bool, output: OutputFormat) -> Result<()> {
    let engine = open_engine(dir)?;
    if corrupted {
        run_corrupted(&engine, output)
    } else {
        run_impl(&engine, status, output)
    }
}

/// Internal implementation that accepts the engine for testing.
pub(crate) fn run_impl(engine: &Engine, status: &[Status], output: OutputFormat) -> Result<()> {
    let records = select(engine, status)?;
    match output {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No records");
            }
            for record in &records {
                println!("{}", format_record_line(record));
            }
            Ok(())
        }
    }
}

/// Records in replay order, optionally restricted to some statuses.
pub(crate) fn select(engine: &Engine, status: &[Status]) -> Result<Vec<Record>> {
    let mut records = engine.queue().list()?;
    if !status.is_empty() {
        records.retain(|r| status.contains(&r.status));
    }
    Ok(records)
}

fn run_corrupted(engine: &Engine, output: OutputFormat) -> Result<()> {
    let corrupted = engine.queue().corrupted()?;
    match output {
        OutputFormat::Json => print_json(&corrupted),
        OutputFormat::Text => {
            if corrupted.is_empty() {
                println!("No corrupted records");
            }
            for item in &corrupted {
                println!("{}", format_corrupted_line(item));
            }
            Ok(())
        }
    }
}

/// One listing line: id, status, action, resource, then retry details.
pub(crate) fn format_record_line(record: &Record) -> String {
    let status = record.status.as_str();
    let pad = " ".repeat(STATUS_WIDTH.saturating_sub(status.len()));
    let mut line = format!(
        "{}  {}{}  {:<6}  {}",
        record.id,
        colors::status(record.status),
        pad,
        record.action.as_str(),
        record.resource_key()
    );
    if record.retry_count > 0 {
        line.push_str(&format!("  retries={}", record.retry_count));
    }
    if let Some(error) = &record.error {
        line.push_str(&format!("  ({error})"));
    }
    line
}

pub(crate) fn format_corrupted_line(item: &Corrupted) -> String {
    format!("{}  {}", item.id, item.reason)
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
