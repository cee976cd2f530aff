//! Durable position ledger
//!
//! One open record per spread id, persisted as a JSON file with a
//! read-all/rewrite-all strategy. That strategy is not safe under concurrent
//! writers, so callers must serialize access to the ledger (the engine holds
//! it behind a single async mutex). The rewrite is not atomic; a crash
//! mid-write can corrupt the file. Known hardening gap, kept as-is.

use crate::core::InstrumentId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use time::OffsetDateTime;

/// Ledger persistence errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One leg of a position at entry time.
#[derive(Debug, Clone, PartialEq)]
pub struct LegEntry {
    pub ticker_id: InstrumentId,
    pub ticker_name: String,
    pub quantity: u32,
    pub entry_price: f64,
}

/// A recorded spread position.
///
/// The exit fields stay empty until the position is explicitly closed; a
/// spread id is unique among open records but may recur across closed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub spread_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub entry_time: OffsetDateTime,

    pub buy_ticker_id: InstrumentId,
    pub buy_ticker_name: String,
    pub buy_quantity: u32,
    pub buy_entry_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_exit_price: Option<f64>,

    pub sell_ticker_id: InstrumentId,
    pub sell_ticker_name: String,
    pub sell_quantity: u32,
    pub sell_entry_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_exit_price: Option<f64>,

    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub exit_time: Option<OffsetDateTime>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

/// Idempotent store of spread positions.
///
/// Stateless over its backing file: every operation loads the full record
/// set and mutations rewrite it, matching the single-writer discipline the
/// file format requires.
pub struct PositionLedger {
    path: PathBuf,
}

impl PositionLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All persisted records, oldest first. A missing file is an empty ledger.
    pub fn positions(&self) -> Result<Vec<Position>, LedgerError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Currently open records.
    pub fn open_positions(&self) -> Result<Vec<Position>, LedgerError> {
        Ok(self
            .positions()?
            .into_iter()
            .filter(Position::is_open)
            .collect())
    }

    /// Whether an open position exists for the spread id.
    pub fn exists(&self, spread_id: &str) -> Result<bool, LedgerError> {
        Ok(self
            .positions()?
            .iter()
            .any(|p| p.is_open() && p.spread_id == spread_id))
    }

    /// Record a new open position unless one already exists for the spread
    /// id. Returns `true` when a record was created, `false` on the no-op.
    pub fn create(
        &self,
        spread_id: &str,
        buy: LegEntry,
        sell: LegEntry,
    ) -> Result<bool, LedgerError> {
        let mut positions = self.positions()?;
        if positions
            .iter()
            .any(|p| p.is_open() && p.spread_id == spread_id)
        {
            tracing::info!(spread_id, "position already exists, skipping create");
            return Ok(false);
        }

        positions.push(Position {
            spread_id: spread_id.to_string(),
            entry_time: OffsetDateTime::now_utc(),
            buy_ticker_id: buy.ticker_id,
            buy_ticker_name: buy.ticker_name,
            buy_quantity: buy.quantity,
            buy_entry_price: buy.entry_price,
            buy_exit_price: None,
            sell_ticker_id: sell.ticker_id,
            sell_ticker_name: sell.ticker_name,
            sell_quantity: sell.quantity,
            sell_entry_price: sell.entry_price,
            sell_exit_price: None,
            exit_time: None,
        });
        self.persist(&positions)?;
        tracing::info!(spread_id, "created position record");
        Ok(true)
    }

    /// Close the open position for a spread id, recording exit prices and
    /// exit time. Returns `false` when no open position exists.
    pub fn close(
        &self,
        spread_id: &str,
        buy_exit_price: f64,
        sell_exit_price: f64,
    ) -> Result<bool, LedgerError> {
        let mut positions = self.positions()?;
        let Some(position) = positions
            .iter_mut()
            .find(|p| p.is_open() && p.spread_id == spread_id)
        else {
            tracing::warn!(spread_id, "no open position to close");
            return Ok(false);
        };

        position.buy_exit_price = Some(buy_exit_price);
        position.sell_exit_price = Some(sell_exit_price);
        position.exit_time = Some(OffsetDateTime::now_utc());
        self.persist(&positions)?;
        tracing::info!(spread_id, "closed position");
        Ok(true)
    }

    fn persist(&self, positions: &[Position]) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec_pretty(positions)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}
