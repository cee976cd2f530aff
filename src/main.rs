//! Spread detection engine over a shared-memory quote bus
//!
//! # Architecture
//! - **core**: Quote and instrument types
//! - **shm**: Fixed-size shared-memory segment store
//! - **spread**: Per-spread evaluation and snapshot writer
//! - **ledger**: Durable position records
//! - **pnl**: Live unrealized P&L projection
//! - **gateway**: Basket order submission
//! - **infrastructure**: Cold path (logging, metrics, config, api)

use spread_core::engine::SpreadEngine;
use spread_core::gateway::OrderGateway;
use spread_core::infrastructure::api::{start_server, AppState};
use spread_core::infrastructure::logging::init_logging;
use spread_core::infrastructure::metrics::MetricsCollector;
use spread_core::ledger::PositionLedger;
use spread_core::pnl::LivePnlTracker;
use spread_core::shm::SegmentStore;
use spread_core::spread::{SnapshotWriter, SpreadDetector};
use spread_core::{Config, Result, SpreadError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

#[tokio::main]
async fn main() -> Result<()> {
    let _guards = init_logging();

    let config = Config::load().map_err(|e| SpreadError::Config(e.to_string()))?;
    tracing::info!(
        spreads = config.spreads.len(),
        refresh_ms = config.engine.refresh_ms,
        "starting spread engine"
    );

    let store = Arc::new(SegmentStore::new(&config.engine.shm_dir));
    let ledger = Arc::new(Mutex::new(PositionLedger::new(&config.engine.ledger_path)));
    let gateway = Arc::new(OrderGateway::new(config.gateway.clone())?);
    let metrics = Arc::new(MetricsCollector::new());

    let detector = Arc::new(SpreadDetector::new(
        store.clone(),
        ledger.clone(),
        config.spread_mapping(),
        config.instrument_catalog(),
        metrics.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut engine = SpreadEngine::new(
        detector,
        SnapshotWriter::new(&config.engine.snapshot_path),
        metrics.clone(),
        Duration::from_millis(config.engine.refresh_ms),
        shutdown_rx,
    );

    let api_state = AppState {
        snapshot: engine.latest_snapshot(),
        ledger: ledger.clone(),
        pnl: Arc::new(LivePnlTracker::new(store, ledger)),
        gateway,
        metrics,
    };
    let api_port = config.api.port;
    tokio::spawn(async move {
        if let Err(e) = start_server(api_state, api_port).await {
            tracing::error!("API Server failed: {}", e);
        }
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("ctrl-c received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    engine.run().await;

    tracing::info!("spread engine stopped");
    Ok(())
}
