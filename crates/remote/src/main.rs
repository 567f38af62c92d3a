// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ebb-remote: reference replay server for the ebb offline queue.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ebb_remote::{ServerOptions, ServerState};

/// ebb-remote: Reference replay server
#[derive(Parser, Debug)]
#[command(name = "ebb-remote")]
#[command(about = "WebSocket replay server for ebb clients")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the replay journal (default: keep state in memory)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Bearer token clients must present
    #[arg(long)]
    token: Option<String>,

    /// Largest accepted payload in bytes
    #[arg(long, default_value_t = ServerOptions::DEFAULT_MAX_PAYLOAD_BYTES)]
    max_payload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = std::env::var("EBB_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting ebb-remote server");
    info!("  Bind address: {}", args.bind);
    match &args.data {
        Some(dir) => info!("  Data directory: {}", dir.display()),
        None => info!("  Data directory: none (in-memory)"),
    }
    if args.token.is_some() {
        info!("  Token: required");
    }

    let options = ServerOptions { token: args.token, max_payload_bytes: args.max_payload_bytes };
    let state = match &args.data {
        Some(dir) => ServerState::open(dir, options)?,
        None => ServerState::in_memory(options),
    };

    ebb_remote::run(args.bind, state).await?;

    Ok(())
}
