// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal colors for help and listing output.
//!
//! Respects environment variables:
//! - `NO_COLOR=1`: Disables colors
//! - `COLOR=1`: Forces colors even without TTY

use std::io::IsTerminal;

use ebb_core::Status;

/// ANSI 256-color codes.
pub mod codes {
    /// Section headers: steel blue
    pub const HEADER: u8 = 74;
    /// Commands/literals: light grey
    pub const LITERAL: u8 = 250;
    /// Defaults and hints: medium grey
    pub const CONTEXT: u8 = 245;
    pub const OK: u8 = 71;
    pub const WARN: u8 = 179;
    pub const FAIL: u8 = 167;
}

/// Check if colors should be enabled based on TTY and environment variables.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }
    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }
    std::io::stdout().is_terminal()
}

fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

const RESET: &str = "\x1b[0m";

fn paint(code: u8, text: &str) -> String {
    format!("{}{}{}", fg256(code), text, RESET)
}

pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

pub fn literal(text: &str) -> String {
    paint(codes::LITERAL, text)
}

pub fn context(text: &str) -> String {
    paint(codes::CONTEXT, text)
}

/// Status word for listings, colored when the terminal allows it.
pub fn status(status: Status) -> String {
    let word = status.as_str();
    if !should_colorize() {
        return word.to_string();
    }
    let code = match status {
        Status::Completed => codes::OK,
        Status::Retrying | Status::Processing => codes::WARN,
        Status::Failed => codes::FAIL,
        Status::Pending => codes::LITERAL,
    };
    paint(code, word)
}

/// Colorize an examples help block.
///
/// Lines ending in `:` are headers. In `  ebb cmd args    Description`
/// lines the command part is a literal and the description stays plain.
pub fn examples(text: &str) -> String {
    if !should_colorize() {
        return text.to_string();
    }
    paint_examples(text)
}

fn paint_examples(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];

        if trimmed.ends_with(':') && !trimmed.contains("  ") {
            lines.push(format!("{indent}{}", header(trimmed)));
        } else if let Some(end) = find_description_start(trimmed) {
            let (cmd, desc) = trimmed.split_at(end);
            lines.push(format!("{indent}{}{desc}", literal(cmd)));
        } else {
            lines.push(line.to_string());
        }
    }
    lines.join("\n")
}

/// Find where the description starts (2+ spaces after the command).
pub fn find_description_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut space_start = None;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b' ' {
            space_start.get_or_insert(i);
        } else if let Some(start) = space_start.take() {
            if i - start >= 2 {
                return Some(start);
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "colors_tests.rs"]
mod tests;
