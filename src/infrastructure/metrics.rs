//! Metrics collection for system monitoring
//!
//! Lock-free counters using atomic operations, updated from the engine
//! loop and exported via the API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Engine metrics collector
///
/// Thread-safe counters updated by the engine and detector tasks.
/// Snapshots taken for API export.
pub struct MetricsCollector {
    /// Completed refresh cycles
    ticks: AtomicU64,
    /// Spread evaluations producing a result record
    results: AtomicU64,
    /// Spread evaluations producing an error entry
    error_results: AtomicU64,
    /// Position records created
    entries_created: AtomicU64,
    /// Basket orders accepted by the gateway
    gateway_accepted: AtomicU64,
    /// Basket orders rejected or failed in transport
    gateway_failed: AtomicU64,
    /// Last completed tick timestamp (Unix millis)
    last_tick_time: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot for API export
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub results: u64,
    pub error_results: u64,
    pub entries_created: u64,
    pub gateway_accepted: u64,
    pub gateway_failed: u64,
    pub last_tick_age_ms: u64,
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            results: AtomicU64::new(0),
            error_results: AtomicU64::new(0),
            entries_created: AtomicU64::new(0),
            gateway_accepted: AtomicU64::new(0),
            gateway_failed: AtomicU64::new(0),
            last_tick_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed refresh cycle with its outcome split.
    pub fn record_tick(&self, results: u64, error_results: u64) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.results.fetch_add(results, Ordering::Relaxed);
        self.error_results.fetch_add(error_results, Ordering::Relaxed);
        self.last_tick_time.store(now_millis(), Ordering::Relaxed);
    }

    /// Record a newly created position.
    pub fn record_entry(&self) {
        self.entries_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a gateway submission outcome.
    pub fn record_gateway(&self, accepted: bool) {
        if accepted {
            self.gateway_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.gateway_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_tick = self.last_tick_time.load(Ordering::Relaxed);
        let last_tick_age_ms = if last_tick == 0 {
            u64::MAX
        } else {
            now_millis().saturating_sub(last_tick)
        };

        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            results: self.results.load(Ordering::Relaxed),
            error_results: self.error_results.load(Ordering::Relaxed),
            entries_created: self.entries_created.load(Ordering::Relaxed),
            gateway_accepted: self.gateway_accepted.load(Ordering::Relaxed),
            gateway_failed: self.gateway_failed.load(Ordering::Relaxed),
            last_tick_age_ms,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
