// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::cli::OutputFormat;
use crate::engine::Engine;
use crate::error::Result;
use crate::network::probe_once;

use super::{open_engine, print_json, runtime};

pub fn run(dir: Option<&Path>, output: OutputFormat) -> Result<()> {
    let engine = open_engine(dir)?;
    if let Some(probe) = engine.probe() {
        runtime()?.block_on(probe_once(engine.monitor(), &probe));
    }
    run_impl(&engine, output)
}

/// Internal implementation that accepts the engine for testing.
pub(crate) fn run_impl(engine: &Engine, output: OutputFormat) -> Result<()> {
    let status = engine.status()?;
    match output {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!("{}", status.to_text());
            let parked = engine.resolver().pending().len();
            if parked > 0 {
                println!("conflicts:    {parked} (see 'ebb conflicts')");
            }
            Ok(())
        }
    }
}
