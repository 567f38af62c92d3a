// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use clap::CommandFactory;
use std::collections::{HashMap, HashSet};

/// Only allowed long-form flags have short forms, every short form maps to
/// its expected long form, and every allowed entry is used somewhere.
#[test]
fn test_flag_consistency() {
    let allowed: HashMap<char, &str> = [('d', "dir"), ('o', "output"), ('s', "status"), ('V', "version")]
        .into_iter()
        .collect();

    let mut cmd = Cli::command();
    cmd.build();
    let mut errors = Vec::new();
    let mut used_shorts = HashSet::new();

    check_command_flags(&cmd, &allowed, &mut errors, &mut used_shorts);

    for (short_char, long_name) in &allowed {
        if !used_shorts.contains(short_char) {
            errors.push(format!("-{short_char} (--{long_name}) is in allowed set but never used"));
        }
    }

    if !errors.is_empty() {
        panic!("Flag consistency violations:\n{}", errors.join("\n"));
    }
}

fn check_command_flags(
    cmd: &clap::Command,
    allowed: &HashMap<char, &str>,
    errors: &mut Vec<String>,
    used_shorts: &mut HashSet<char>,
) {
    for arg in cmd.get_arguments() {
        let long = arg.get_long();
        let Some(short_char) = arg.get_short() else {
            continue;
        };
        if short_char == 'h' && long == Some("help") {
            continue;
        }
        used_shorts.insert(short_char);

        match (allowed.get(&short_char), long) {
            (Some(expected), Some(actual)) if actual != *expected => errors.push(format!(
                "{}: -{short_char} maps to --{actual} but should map to --{expected}",
                cmd.get_name()
            )),
            (Some(_), Some(_)) => {}
            (Some(expected), None) => errors.push(format!(
                "{}: -{short_char} has no long form, expected --{expected}",
                cmd.get_name()
            )),
            (None, _) => errors.push(format!(
                "{}: -{short_char} (--{}) is not an allowed short flag",
                cmd.get_name(),
                long.unwrap_or("(none)")
            )),
        }
    }

    for sub in cmd.get_subcommands() {
        check_command_flags(sub, allowed, errors, used_shorts);
    }
}

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}
