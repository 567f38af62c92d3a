// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use ebb::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // EBB_LOG wins over RUST_LOG; stdout stays clean for command output.
    let filter = ebb::env::log_filter()
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = ebb::run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
