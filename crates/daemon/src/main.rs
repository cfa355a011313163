// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetd`: runs policy leadership for the configured policies until
//! interrupted, then releases what it holds.

use fleet_core::SystemClock;
use fleet_daemon::{Config, LeadershipMonitor, MonitorSettings};
use fleet_storage::MemoryStore;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let _log_guard = fleet_daemon::logging::init(&config.logging)?;

    tracing::info!(
        server_id = %config.server.id,
        version = %config.server.version,
        policies = ?config.leadership.policy_ids,
        "fleetd starting"
    );

    let store = MemoryStore::new();
    let monitor = LeadershipMonitor::new(store, SystemClock, MonitorSettings::from(&config));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        shutdown.cancel();
    });

    monitor.run(&cancel).await;
    tracing::info!("fleetd stopped");
    Ok(())
}
