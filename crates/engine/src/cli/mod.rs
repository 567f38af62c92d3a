// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use std::path::PathBuf;

use crate::colors;
use crate::help;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

pub use args::{ActionArg, StatusArg};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "ebb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "An offline mutation queue that replays local changes when the network returns")]
#[command(help_template = help::template())]
#[command(before_help = help::commands())]
#[command(after_help = help::quickstart())]
#[command(styles = help::styles())]
pub struct Cli {
    /// Data directory (default: $EBB_DIR, then the platform data dir)
    #[arg(short = 'd', long = "dir", global = true, value_name = "path")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Queue
    // ─────────────────────────────────────────────────────────────────────────
    /// Queue a mutation for replay
    #[command(after_help = colors::examples("\
Examples:
  ebb enqueue todo todo-1 create '{\"title\":\"A\"}'   Queue a create
  ebb enqueue todo todo-1 delete                     Queue a delete
  echo '{\"done\":true}' | ebb enqueue todo todo-1 update -   Read payload from stdin"))]
    Enqueue {
        /// Resource type (e.g. todo)
        #[arg(value_parser = non_empty_string)]
        resource_type: String,

        /// Resource id
        #[arg(value_parser = non_empty_string)]
        resource_id: String,

        /// Mutation kind
        #[arg(value_enum)]
        action: ActionArg,

        /// JSON payload, or '-' to read it from stdin (default: {})
        payload: Option<String>,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List queued records in replay order
    #[command(after_help = colors::examples("\
Examples:
  ebb list                   All records
  ebb list -s failed         Only failed records
  ebb list --corrupted       Records that failed validation"))]
    List {
        /// Filter by status (repeatable)
        #[arg(long, short = 's', value_enum)]
        status: Vec<StatusArg>,

        /// Show corrupted records instead
        #[arg(long, conflicts_with = "status")]
        corrupted: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Show one record
    Show {
        /// Record id
        id: String,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Return failed records to the queue with a fresh retry budget
    #[command(arg_required_else_help = true)]
    Retry {
        /// Record ids
        #[arg(required_unless_present = "all")]
        ids: Vec<String>,

        /// Retry every failed record
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },

    /// Remove completed records older than the cleanup age
    Compact,

    /// Remove failed records
    ClearFailed,

    /// Remove a corrupted record
    Discard {
        /// Record id
        id: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Show sync status
    Status {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Run one replay cycle against the remote
    #[command(after_help = colors::examples("\
Examples:
  ebb sync             Replay if the remote is reachable
  ebb sync --force     Replay even if the probe says offline"))]
    Sync {
        /// Skip the connectivity check
        #[arg(long)]
        force: bool,

        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Replay continuously until interrupted
    Run {
        /// Seconds between connectivity probes
        #[arg(long, default_value_t = 5)]
        probe_interval: u64,
    },

    /// List conflicts awaiting resolution
    Conflicts {
        /// Output format (text, json)
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Resolve a conflict by keeping one side
    #[command(after_help = colors::examples("\
Examples:
  ebb resolve <id> local     Keep the local mutation
  ebb resolve <id> remote    Adopt the remote state"))]
    Resolve {
        /// Record id of the conflict
        id: String,

        /// Side to keep: local (mine) or remote (theirs)
        choice: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Initialize a data directory
    Init {
        /// Device id used in vector clocks (default: derived from host and path)
        #[arg(long, value_parser = non_empty_string)]
        device_id: Option<String>,

        /// Remote WebSocket URL (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,

        /// Bearer token for the remote
        #[arg(long, requires = "remote")]
        token: Option<String>,
    },

    /// Export all records as a JSON bundle
    Export {
        /// Output file (default: stdout)
        file: Option<PathBuf>,
    },

    /// Import an export bundle
    Import {
        /// Bundle file, or '-' for stdin
        file: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
