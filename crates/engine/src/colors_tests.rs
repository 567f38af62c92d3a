// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

/// Strip all ANSI escape sequences from a string
fn strip_ansi(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[test]
fn paint_wraps_text_in_256_color_codes() {
    assert_eq!(header("Sync:"), "\x1b[38;5;74mSync:\x1b[0m");
    assert_eq!(literal("ebb"), "\x1b[38;5;250mebb\x1b[0m");
    assert_eq!(context("<id>"), "\x1b[38;5;245m<id>\x1b[0m");
}

#[parameterized(
    simple = { "ebb list  List records", Some(8) },
    wide_gap = { "ebb sync --force     Sync now", Some(16) },
    single_spaces = { "ebb list records", None },
    trailing = { "ebb list  ", None },
)]
fn description_start(line: &str, expected: Option<usize>) {
    assert_eq!(find_description_start(line), expected);
}

#[test]
fn examples_color_headers_and_commands_only() {
    let text = "Examples:\n  ebb list -o json    List as JSON\nplain line";
    let painted = paint_examples(text);

    assert!(painted.starts_with(&header("Examples:")));
    assert!(painted.contains(&format!("  {}    List as JSON", literal("ebb list -o json"))));
    assert!(painted.ends_with("\nplain line"));
    assert_eq!(strip_ansi(&painted), text);
}
