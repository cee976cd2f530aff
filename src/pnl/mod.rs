//! Live P&L projection
//!
//! Read-side only: recomputes unrealized P&L for every open position from
//! the ledger plus the current shared-memory quotes. Never mutates the
//! ledger and is safe to run concurrently with ledger writes (eventually
//! consistent).

use crate::ledger::{Position, PositionLedger};
use crate::shm::SegmentStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Unrealized P&L for one open position, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionPnl {
    pub spread_id: String,
    pub buy_pnl: f64,
    pub sell_pnl: f64,
    pub total_pnl: f64,
}

/// Projects unrealized P&L over the ledger and the quote bus.
pub struct LivePnlTracker {
    store: Arc<SegmentStore>,
    ledger: Arc<Mutex<PositionLedger>>,
}

impl LivePnlTracker {
    pub fn new(store: Arc<SegmentStore>, ledger: Arc<Mutex<PositionLedger>>) -> Self {
        Self { store, ledger }
    }

    /// P&L for every open position with live quotes on both legs.
    /// Positions missing either leg's LTP are skipped for this pass —
    /// never zero-filled, never an error.
    pub async fn compute(&self) -> Vec<PositionPnl> {
        let positions = {
            let ledger = self.ledger.lock().await;
            match ledger.open_positions() {
                Ok(positions) => positions,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to load open positions for P&L");
                    return Vec::new();
                }
            }
        };

        positions
            .iter()
            .filter_map(|p| self.position_pnl(p))
            .collect()
    }

    fn position_pnl(&self, position: &Position) -> Option<PositionPnl> {
        let buy_ltp = self.store.read(&position.buy_ticker_id)?.ltp()?;
        let sell_ltp = self.store.read(&position.sell_ticker_id)?.ltp()?;

        // Full precision inside, rounded only at the output boundary.
        let buy_pnl =
            (buy_ltp - position.buy_entry_price) * f64::from(position.buy_quantity);
        let sell_pnl =
            (position.sell_entry_price - sell_ltp) * f64::from(position.sell_quantity);

        Some(PositionPnl {
            spread_id: position.spread_id.clone(),
            buy_pnl: round2(buy_pnl),
            sell_pnl: round2(sell_pnl),
            total_pnl: round2(buy_pnl + sell_pnl),
        })
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
