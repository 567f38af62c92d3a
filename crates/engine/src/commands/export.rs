// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::engine::Engine;
use crate::error::Result;

use super::open_engine;

pub fn run(dir: Option<&Path>, file: Option<&Path>) -> Result<()> {
    let engine = open_engine(dir)?;
    match file {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            let count = run_impl(&engine, &mut writer)?;
            writer.flush()?;
            eprintln!("Exported {} records to {}", count, path.display());
        }
        None => {
            run_impl(&engine, &mut std::io::stdout().lock())?;
        }
    }
    Ok(())
}

/// Internal implementation that accepts the engine for testing.
pub(crate) fn run_impl(engine: &Engine, out: &mut impl Write) -> Result<usize> {
    let bundle = engine.queue().export_all()?;
    writeln!(out, "{}", bundle.to_json_pretty()?)?;
    Ok(bundle.items.len())
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
