// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;
use std::path::Path;

use ebb_core::export::parse_text;

use crate::engine::Engine;
use crate::error::Result;

use super::open_engine;

pub fn run(dir: Option<&Path>, file: &str) -> Result<()> {
    let text = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };
    let engine = open_engine(dir)?;
    let imported = run_impl(&engine, &text)?;
    println!("Imported {imported} records");
    Ok(())
}

/// Internal implementation that accepts the engine for testing.
///
/// A partially valid bundle stores the valid items and fails with
/// `PartialImport` listing the rejects.
pub(crate) fn run_impl(engine: &Engine, text: &str) -> Result<usize> {
    let bundle = parse_text(text)?;
    Ok(engine.queue().import_all(&bundle)?)
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
