//! Core Application Engine
//!
//! Runs the refresh cycle: fans all configured spread ids out to concurrent
//! tasks, joins them, and replaces the result snapshot wholesale. Per-spread
//! failures land in the snapshot as error entries; they never abort the
//! batch or the loop.

use crate::infrastructure::metrics::MetricsCollector;
use crate::spread::{SnapshotMap, SnapshotWriter, SpreadDetector};
use futures_util::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Attempts for a snapshot write before giving up for the tick.
const SNAPSHOT_WRITE_ATTEMPTS: u32 = 3;
/// Pause between snapshot write attempts.
const SNAPSHOT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Main engine driving spread evaluation ticks.
pub struct SpreadEngine {
    detector: Arc<SpreadDetector>,
    writer: SnapshotWriter,
    snapshot: Arc<RwLock<SnapshotMap>>,
    metrics: Arc<MetricsCollector>,
    refresh: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SpreadEngine {
    pub fn new(
        detector: Arc<SpreadDetector>,
        writer: SnapshotWriter,
        metrics: Arc<MetricsCollector>,
        refresh: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            detector,
            writer,
            snapshot: Arc::new(RwLock::new(SnapshotMap::new())),
            metrics,
            refresh,
            shutdown,
        }
    }

    /// Shared handle to the latest in-memory snapshot (for the API).
    pub fn latest_snapshot(&self) -> Arc<RwLock<SnapshotMap>> {
        self.snapshot.clone()
    }

    /// Run refresh cycles until shutdown is signalled.
    pub async fn run(&mut self) {
        tracing::info!(
            spreads = self.detector.spread_ids().len(),
            refresh_ms = self.refresh.as_millis() as u64,
            "engine running"
        );

        let mut interval = tokio::time::interval(self.refresh);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("shutdown signal received, stopping engine");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.run_tick().await;
                }
            }
        }
    }

    /// One refresh cycle over every configured spread id.
    ///
    /// Each spread id is evaluated on its own task; results are joined
    /// before the snapshot write, with no ordering guarantee across ids. A
    /// batch that observes shutdown before the write is discarded so the
    /// previous snapshot is never replaced by a partial one.
    pub async fn run_tick(&self) {
        let mut handles = Vec::new();
        for spread_id in self.detector.spread_ids() {
            let detector = self.detector.clone();
            handles.push(tokio::spawn(async move {
                let outcome = detector.evaluate(&spread_id).await;
                (spread_id, outcome)
            }));
        }

        let mut batch = SnapshotMap::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((spread_id, outcome)) => {
                    batch.insert(spread_id, outcome);
                }
                // A panicked evaluation is isolated like any other failure.
                Err(e) => {
                    tracing::error!(error = %e, "spread evaluation task failed");
                }
            }
        }

        if *self.shutdown.borrow() {
            tracing::warn!("shutdown during batch, discarding tick results");
            return;
        }

        let error_results = batch.values().filter(|o| o.is_failure()).count() as u64;
        let results = batch.len() as u64 - error_results;
        self.metrics.record_tick(results, error_results);

        *self.snapshot.write() = batch.clone();
        self.persist_snapshot(&batch).await;
    }

    /// Persist the snapshot, retrying with backoff; a persistent failure is
    /// logged and skipped rather than crashing the tick.
    async fn persist_snapshot(&self, batch: &SnapshotMap) {
        for attempt in 1..=SNAPSHOT_WRITE_ATTEMPTS {
            match self.writer.write(batch) {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(attempt, error = %e, "snapshot write failed");
                    if attempt < SNAPSHOT_WRITE_ATTEMPTS {
                        tokio::time::sleep(SNAPSHOT_RETRY_BACKOFF).await;
                    }
                }
            }
        }
    }
}
