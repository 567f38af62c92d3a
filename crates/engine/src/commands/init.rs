// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use chrono::Utc;

use crate::config::{generate_device_id, init_data_dir, resolve_data_dir, Config, RemoteConfig};
use crate::env;
use crate::error::Result;

pub fn run(
    dir: Option<&Path>,
    device_id: Option<String>,
    remote: Option<String>,
    token: Option<String>,
) -> Result<()> {
    let data_dir = resolve_data_dir(dir)?;
    let config = build_config(&data_dir, device_id, remote, token);
    init_data_dir(&data_dir, &config)?;

    println!("Initialized ebb at {}", data_dir.display());
    println!("Device: {}", config.device_id);
    if let Some(remote) = &config.remote {
        println!("Remote: {}", remote.url);
    }
    Ok(())
}

/// Config for a new data directory.
///
/// The device id comes from `--device-id`, then `EBB_DEVICE_ID`, then a hash
/// of the directory and the current time.
pub(crate) fn build_config(
    data_dir: &Path,
    device_id: Option<String>,
    remote: Option<String>,
    token: Option<String>,
) -> Config {
    let device_id = device_id.or_else(env::device_id).unwrap_or_else(|| {
        let seed = format!("{}@{}", data_dir.display(), Utc::now().timestamp_nanos_opt().unwrap_or_default());
        generate_device_id(&seed)
    });

    let mut config = Config::new(device_id);
    config.remote = remote.map(|url| RemoteConfig { token, ..RemoteConfig::new(url) });
    config
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
