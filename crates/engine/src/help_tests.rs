// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::cli::Cli;
use clap::CommandFactory;

#[test]
fn commands_list_names_every_subcommand() {
    let listed = commands();
    for sub in Cli::command().get_subcommands() {
        let name = sub.get_name();
        if name == "help" {
            continue;
        }
        assert!(listed.contains(name), "help is missing '{name}'");
    }
}

#[test]
fn template_keeps_clap_placeholders() {
    let template = template();
    for placeholder in ["{usage}", "{before-help}", "{options}", "{after-help}"] {
        assert!(template.contains(placeholder), "missing {placeholder}");
    }
}

#[test]
fn quickstart_mentions_init_and_sync() {
    let text = quickstart();
    assert!(text.contains("ebb init"));
    assert!(text.contains("ebb sync"));
}
