// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::error::Error;
use tempfile::TempDir;

#[test]
fn explicit_device_id_and_remote() {
    let config = build_config(
        Path::new("/tmp/ebb"),
        Some("laptop".into()),
        Some("ws://localhost:7890".into()),
        Some("secret".into()),
    );

    assert_eq!(config.device_id, "laptop");
    let remote = config.remote.unwrap();
    assert_eq!(remote.url, "ws://localhost:7890");
    assert_eq!(remote.token.as_deref(), Some("secret"));
    assert_eq!(remote.request_timeout_ms, 10_000);
}

#[test]
fn generated_device_id_is_valid() {
    let config = build_config(Path::new("/tmp/ebb"), None, None, None);
    if env::device_id().is_none() {
        assert!(config.device_id.starts_with("dev-"));
    }
    assert!(config.remote.is_none());
    config.validate().unwrap();
}

#[test]
fn run_creates_config_once() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");

    run(Some(&data_dir), Some("dev1".into()), None, None).unwrap();
    assert_eq!(Config::load(&data_dir).unwrap().device_id, env::device_id().unwrap_or("dev1".into()));

    let err = run(Some(&data_dir), Some("dev2".into()), None, None).unwrap_err();
    assert!(matches!(err, Error::AlreadyInitialized(_)));
}

#[test]
fn run_rejects_non_websocket_remote() {
    let dir = TempDir::new().unwrap();
    let err = run(Some(dir.path()), Some("dev1".into()), Some("http://example.com".into()), None).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(!dir.path().join("config.toml").exists());
}
