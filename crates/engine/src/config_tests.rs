// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn minimal_config_takes_defaults() {
    let config = Config::parse("device_id = \"dev1\"\n").unwrap();
    assert_eq!(config, Config::new("dev1".into()));
    assert!(config.auto_process);
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.max_queue_size, 1000);
    assert_eq!(config.priorities.weight("todo"), 10);
}

#[test]
fn camel_case_aliases_are_accepted() {
    let config = Config::parse(
        r#"
deviceId = "dev1"
autoProcess = false
processIntervalMs = 500
maxRetries = 2
exponentialBackoff = false
rateLimitDelayMs = 0
maxQueueSize = 100
circuitBreakerThreshold = 3
autoResolveConflicts = false
cleanupAgeMs = 1000
"#,
    )
    .unwrap();

    assert!(!config.auto_process);
    assert_eq!(config.process_interval_ms, 500);
    assert_eq!(config.max_retries, 2);
    assert!(!config.exponential_backoff);
    assert_eq!(config.rate_limit_delay_ms, 0);
    assert_eq!(config.max_queue_size, 100);
    assert_eq!(config.circuit_breaker_threshold, 3);
    assert!(!config.auto_resolve_conflicts);
    assert_eq!(config.cleanup_age_ms, 1000);
}

#[test]
fn remote_and_priorities_sections() {
    let config = Config::parse(
        r#"
device_id = "dev1"

[remote]
url = "ws://localhost:7890"
token = "secret"

[priorities]
default = 20
todo = 1
"#,
    )
    .unwrap();

    let remote = config.remote.as_ref().unwrap();
    assert_eq!(remote.token.as_deref(), Some("secret"));
    assert_eq!(remote.connect_timeout_ms, 5000);
    assert_eq!(config.priorities.weight("todo"), 1);
    assert_eq!(config.priorities.weight("note"), 20);
}

#[parameterized(
    missing_device = { "max_retries = 1" , "device_id" },
    device_with_colon = { "device_id = \"a:b\"", "may not contain" },
    zero_queue = { "device_id = \"d\"\nmax_queue_size = 0", "max_queue_size" },
    zero_threshold = { "device_id = \"d\"\ncircuit_breaker_threshold = 0", "circuit_breaker_threshold" },
    zero_batch = { "device_id = \"d\"\nbatch_size = 0", "batch_size" },
    inverted_delays = { "device_id = \"d\"\nretry_base_delay_ms = 10\nretry_max_delay_ms = 1", "retry_base_delay_ms" },
    http_remote = { "device_id = \"d\"\n[remote]\nurl = \"http://x\"", "must be ws:// or wss://" },
    bad_toml = { "device_id = ", "failed to parse" },
)]
fn invalid_configs(text: &str, expected: &str) {
    let err = Config::parse(text).unwrap_err();
    assert!(err.to_string().contains(expected), "{err}");
}

#[test]
fn save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new("dev-a".into());
    config.remote = Some(RemoteConfig::new("wss://sync.example.com/replay"));
    config.priorities.resources.insert("todo".into(), 3);

    init_data_dir(dir.path(), &config).unwrap();
    assert_eq!(Config::load(dir.path()).unwrap(), config);
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    let config = Config::new("dev-a".into());
    init_data_dir(dir.path(), &config).unwrap();
    assert!(matches!(init_data_dir(dir.path(), &config), Err(Error::AlreadyInitialized(_))));
}

#[test]
fn load_uninitialized_dir() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(Config::load(dir.path()), Err(Error::NotInitialized(_))));
}

#[test]
fn explicit_data_dir_wins() {
    let path = Path::new("/tmp/ebb-explicit");
    assert_eq!(resolve_data_dir(Some(path)).unwrap(), path);
}

#[test]
fn options_carry_durations() {
    let mut config = Config::new("d".into());
    config.rate_limit_delay_ms = 250;
    config.cleanup_age_ms = 60_000;
    assert_eq!(config.sync_options().rate_limit_delay, Duration::from_millis(250));
    assert_eq!(config.queue_options().cleanup_age, Duration::from_secs(60));
}

#[test]
fn generated_device_ids_are_stable_and_prefixed() {
    let a = generate_device_id("host|1");
    assert_eq!(a, generate_device_id("host|1"));
    assert_ne!(a, generate_device_id("host|2"));
    assert!(a.starts_with("dev-"));
    assert_eq!(a.len(), 12);
}
