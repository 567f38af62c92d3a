// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `ebb sync` and `ebb run`.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::engine::{save_journal, Engine};
use crate::error::Result;
use crate::network::{probe_once, watch};
use crate::sync::{CycleEvent, CycleReport, Remote, SkipReason};

use super::{open_engine, print_json, runtime};

pub fn run(dir: Option<&Path>, force: bool, output: OutputFormat) -> Result<()> {
    let engine = open_engine(dir)?;
    let remote = engine.websocket_remote()?;
    let report = runtime()?.block_on(async {
        if !force {
            if let Some(probe) = engine.probe() {
                probe_once(engine.monitor(), &probe).await;
            }
        }
        sync_impl(&engine, remote, force).await
    })?;

    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!("{}", format_report(&report));
            Ok(())
        }
    }
}

/// Runs one cycle and writes the conflict journal, even if the cycle halted.
pub(crate) async fn sync_impl<R: Remote>(engine: &Engine, remote: R, force: bool) -> Result<CycleReport> {
    let coordinator = engine.coordinator(remote);
    let result = if force {
        coordinator.force_sync().await
    } else {
        coordinator.run_cycle().await
    };
    engine.persist_conflicts()?;
    result
}

pub fn run_loop(dir: Option<&Path>, probe_interval: u64) -> Result<()> {
    let engine = open_engine(dir)?;
    let remote = engine.websocket_remote()?;
    let interval = Duration::from_secs(probe_interval.max(1));
    runtime()?.block_on(run_loop_impl(&engine, remote, interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for interrupts");
            std::future::pending::<()>().await;
        }
    }))
}

/// Replays until `stop` resolves or storage runs out.
///
/// Connectivity comes from pinging the remote every `probe_interval`. The
/// conflict journal is rewritten after every cycle that saw conflicts.
pub(crate) async fn run_loop_impl<R: Remote>(
    engine: &Engine,
    remote: R,
    probe_interval: Duration,
    stop: impl Future<Output = ()>,
) -> Result<()> {
    let coordinator = engine.coordinator(remote);
    let data_dir = engine.data_dir().to_path_buf();
    let resolver = Arc::clone(engine.resolver());
    coordinator.on_cycle_event(move |event| match event {
        CycleEvent::CycleFinished(report) if report.conflicts > 0 => {
            if let Err(e) = save_journal(&data_dir, &resolver) {
                warn!(error = %e, "failed to write conflict journal");
            }
        }
        CycleEvent::ItemFailed { id, kind, error } => {
            eprintln!("warning: {id} failed ({kind}): {error}");
        }
        _ => {}
    });

    let cancel = CancellationToken::new();
    let watcher = engine.ping_probe().map(|probe| {
        let monitor = Arc::clone(engine.monitor());
        let cancel = cancel.clone();
        tokio::spawn(async move { watch(&monitor, &probe, probe_interval, cancel).await })
    });

    let run = coordinator.run();
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result,
        _ = stop => {
            info!("stop requested");
            coordinator.shutdown();
            run.await
        }
    };

    cancel.cancel();
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }
    engine.persist_conflicts()?;
    result
}

pub(crate) fn format_report(report: &CycleReport) -> String {
    if let Some(reason) = report.skipped {
        let why = match reason {
            SkipReason::AlreadySyncing => "a cycle is already running",
            SkipReason::Paused => "paused after an authentication failure",
            SkipReason::CircuitOpen => "too many failed cycles, waiting for cool-down",
            SkipReason::Offline => "remote unreachable (use --force to try anyway)",
            SkipReason::Shutdown => "shutting down",
        };
        return format!("Sync skipped: {why}");
    }

    let mut text = format!("Replayed {} of {} attempted", report.completed, report.attempted);
    for (count, label) in [
        (report.retrying, "retrying"),
        (report.failed, "failed"),
        (report.conflicts, "conflicts"),
        (report.superseded, "superseded"),
    ] {
        if count > 0 {
            text.push_str(&format!(", {count} {label}"));
        }
    }
    if report.cancelled {
        text.push_str(" (cancelled)");
    }
    if let Some(error) = &report.error {
        text.push_str(&format!("\nlast error: {error}"));
    }
    text
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
