// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Help text generation with colorization support.

use crate::colors;
use clap::builder::styling::Styles;

/// Clap styles matching the listing colors.
pub fn styles() -> Styles {
    if !colors::should_colorize() {
        return Styles::plain();
    }

    use anstyle::{Ansi256Color, Color, Style};

    let header = Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(colors::codes::HEADER))));
    let literal = Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(colors::codes::LITERAL))));
    let context = Style::new().fg_color(Some(Color::Ansi256(Ansi256Color(colors::codes::CONTEXT))));

    Styles::styled()
        .header(header)
        .usage(header)
        .literal(literal)
        .placeholder(context)
        .valid(context)
}

/// Main help template: commands list, then options.
pub fn template() -> String {
    format!(
        "{{about-with-newline}}
{{usage-heading}} {{usage}}

{{before-help}}{}
{{options}}{{after-help}}",
        colors::header("Options:")
    )
}

/// Commands list shown before options in main help.
pub fn commands() -> String {
    let row = |name: &str, about: &str| format!("  {}{}{about}", colors::literal(name), " ".repeat(14 - name.len()));
    [
        colors::header("Queue:"),
        row("enqueue", "Queue a mutation for replay"),
        row("list", "List queued records"),
        row("show", "Show one record"),
        row("retry", "Return failed records to the queue"),
        row("compact", "Remove old completed records"),
        row("clear-failed", "Remove failed records"),
        row("discard", "Remove a corrupted record"),
        String::new(),
        colors::header("Sync:"),
        row("status", "Show sync status"),
        row("sync", "Run one replay cycle"),
        row("run", "Replay continuously until interrupted"),
        row("conflicts", "List conflicts awaiting resolution"),
        row("resolve", "Resolve a conflict"),
        String::new(),
        colors::header("Setup:"),
        row("init", "Initialize a data directory"),
        row("export", "Export all records as JSON"),
        row("import", "Import an export bundle"),
        row("completions", "Generate shell completions"),
    ]
    .join("\n")
}

/// Quickstart help shown after options in main help.
pub fn quickstart() -> String {
    colors::examples(
        "\
Get started:
  ebb init --remote ws://localhost:7890           Initialize with a remote
  ebb enqueue todo todo-1 create '{\"title\":\"A\"}'  Queue a mutation
  ebb sync                                        Replay what is due
  ebb status                                      Check progress",
    )
}

#[cfg(test)]
#[path = "help_tests.rs"]
mod tests;
