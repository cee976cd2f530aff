//! Per-spread opportunity detection
//!
//! For each configured spread id the detector reads the primary quote and
//! both leg quotes from shared memory, assigns buy/sell roles by the sign of
//! the primary LTP, computes the directional spread and profit estimate, and
//! opens a ledger position when the entry condition holds. Every data
//! problem becomes an explicit per-spread error outcome; nothing here ever
//! aborts a sibling spread.

use crate::core::{InstrumentCatalog, InstrumentId, SpreadMapping};
use crate::infrastructure::metrics::MetricsCollector;
use crate::ledger::{LegEntry, PositionLedger};
use crate::shm::SegmentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Attempts for a ledger write before giving up for the tick.
const LEDGER_WRITE_ATTEMPTS: u32 = 3;
/// Pause between ledger write attempts.
const LEDGER_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Computed result for one spread id on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadResult {
    #[serde(rename = "LTP")]
    pub ltp: f64,
    pub instrument_name: String,
    pub buy_leg: InstrumentId,
    pub sell_leg: InstrumentId,
    pub buy_ask_price: f64,
    pub sell_bid_price: f64,
    pub spread: f64,
    pub profit: f64,
    pub expiry_dates: Vec<String>,
}

/// Per-spread outcome: either a result record or an explicit error entry.
/// Errors are rendered in the snapshot rather than silently omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpreadOutcome {
    Failure { error: String },
    Result(SpreadResult),
}

impl SpreadOutcome {
    fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Detector over the segment store, spread mapping and position ledger.
pub struct SpreadDetector {
    store: Arc<SegmentStore>,
    ledger: Arc<Mutex<PositionLedger>>,
    mapping: SpreadMapping,
    catalog: InstrumentCatalog,
    metrics: Arc<MetricsCollector>,
}

impl SpreadDetector {
    pub fn new(
        store: Arc<SegmentStore>,
        ledger: Arc<Mutex<PositionLedger>>,
        mapping: SpreadMapping,
        catalog: InstrumentCatalog,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            ledger,
            mapping,
            catalog,
            metrics,
        }
    }

    /// All configured spread ids.
    pub fn spread_ids(&self) -> Vec<String> {
        self.mapping.spread_ids().map(str::to_string).collect()
    }

    /// Evaluate one spread id for the current tick.
    pub async fn evaluate(&self, spread_id: &str) -> SpreadOutcome {
        let primary: InstrumentId = spread_id.into();
        let Some(primary_quote) = self.store.read(&primary) else {
            return SpreadOutcome::failure(format!(
                "no quote in shared memory for spread {spread_id}"
            ));
        };
        let Some(ltp) = primary_quote.ltp() else {
            return SpreadOutcome::failure(format!(
                "missing last traded price for spread {spread_id}"
            ));
        };

        let legs = self.mapping.legs(spread_id).unwrap_or(&[]);
        if legs.len() != 2 {
            return SpreadOutcome::failure(format!(
                "spread {spread_id} maps to {} legs, expected exactly 2",
                legs.len()
            ));
        }

        // Role assignment by sign of the primary LTP: a positive basis takes
        // leg[0]'s ask as the buy side and leg[1]'s bid as the sell side; a
        // non-positive basis swaps the roles.
        let (buy_leg, sell_leg) = if ltp > 0.0 {
            (&legs[0], &legs[1])
        } else {
            (&legs[1], &legs[0])
        };

        let Some(buy_quote) = self.store.read(buy_leg) else {
            return SpreadOutcome::failure(format!(
                "no quote in shared memory for leg {buy_leg}"
            ));
        };
        let Some(sell_quote) = self.store.read(sell_leg) else {
            return SpreadOutcome::failure(format!(
                "no quote in shared memory for leg {sell_leg}"
            ));
        };

        // A quote with an empty book side contributes price 0, same as the
        // producer protocol's null levels.
        let buy_ask = buy_quote.best_ask().unwrap_or(0.0);
        let sell_bid = sell_quote.best_bid().unwrap_or(0.0);

        let actual_spread = (sell_bid - buy_ask).abs();
        // Lot size is keyed by the second configured leg; unconfigured
        // instruments yield a profit estimate of 0.
        let lot_size = self.catalog.lot_size(&legs[1]);
        let profit = actual_spread * f64::from(lot_size);

        if ltp.abs() > actual_spread && ltp != 0.0 {
            self.try_open_position(spread_id, buy_leg, sell_leg, lot_size, buy_ask, sell_bid)
                .await;
        }

        SpreadOutcome::Result(SpreadResult {
            ltp,
            instrument_name: self.catalog.name_of(&primary),
            buy_leg: buy_leg.clone(),
            sell_leg: sell_leg.clone(),
            buy_ask_price: buy_ask,
            sell_bid_price: sell_bid,
            spread: actual_spread,
            profit,
            expiry_dates: self.catalog.expiry_dates().to_vec(),
        })
    }

    /// Open a position for the spread unless one is already open.
    ///
    /// Ledger persistence failures are logged and retried with a short
    /// backoff; a tick never crashes on a ledger write.
    async fn try_open_position(
        &self,
        spread_id: &str,
        buy_leg: &InstrumentId,
        sell_leg: &InstrumentId,
        lot_size: u32,
        buy_ask: f64,
        sell_bid: f64,
    ) {
        let buy = LegEntry {
            ticker_id: buy_leg.clone(),
            ticker_name: self.catalog.name_of(buy_leg),
            quantity: lot_size,
            entry_price: buy_ask,
        };
        let sell = LegEntry {
            ticker_id: sell_leg.clone(),
            ticker_name: self.catalog.name_of(sell_leg),
            quantity: lot_size,
            entry_price: sell_bid,
        };

        let ledger = self.ledger.lock().await;
        for attempt in 1..=LEDGER_WRITE_ATTEMPTS {
            match ledger.create(spread_id, buy.clone(), sell.clone()) {
                Ok(true) => {
                    self.metrics.record_entry();
                    tracing::info!(
                        spread_id,
                        buy_leg = %buy_leg,
                        sell_leg = %sell_leg,
                        buy_entry = buy_ask,
                        sell_entry = sell_bid,
                        "entry signal, opened position"
                    );
                    return;
                }
                Ok(false) => return,
                Err(e) => {
                    tracing::error!(
                        spread_id,
                        attempt,
                        error = %e,
                        "ledger write failed"
                    );
                    if attempt < LEDGER_WRITE_ATTEMPTS {
                        tokio::time::sleep(LEDGER_RETRY_BACKOFF).await;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PriceLevel, Quote, Touchline};
    use std::collections::HashMap;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<SegmentStore>,
        ledger: Arc<Mutex<PositionLedger>>,
        detector: SpreadDetector,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SegmentStore::new(dir.path()));
        let ledger = Arc::new(Mutex::new(PositionLedger::new(
            dir.path().join("positions.json"),
        )));

        let mut legs = HashMap::new();
        legs.insert("100".to_string(), vec!["11".into(), "22".into()]);
        legs.insert("200".to_string(), vec!["33".into()]);
        let mapping = SpreadMapping::new(legs);

        let mut names = HashMap::new();
        names.insert("100".to_string(), "STOCK SPREAD".to_string());
        let mut lots = HashMap::new();
        lots.insert("22".to_string(), 175);
        let catalog =
            InstrumentCatalog::new(names, lots, vec!["2025-02-28".to_string()]);

        let detector = SpreadDetector::new(
            store.clone(),
            ledger.clone(),
            mapping,
            catalog,
            Arc::new(MetricsCollector::new()),
        );
        Fixture {
            _dir: dir,
            store,
            ledger,
            detector,
        }
    }

    fn quote(ltp: Option<f64>, bid: Option<f64>, ask: Option<f64>) -> Quote {
        Quote {
            touchline: Some(Touchline {
                last_traded_price: ltp,
            }),
            bids: bid.map(|p| vec![PriceLevel { price: p }]).unwrap_or_default(),
            asks: ask.map(|p| vec![PriceLevel { price: p }]).unwrap_or_default(),
        }
    }

    fn publish(store: &SegmentStore, id: &str, q: &Quote) {
        store.publish(&id.into(), q).unwrap();
    }

    #[tokio::test]
    async fn test_entry_scenario_positive_ltp() {
        let fx = fixture();
        publish(&fx.store, "100", &quote(Some(12.0), None, None));
        publish(&fx.store, "11", &quote(Some(49.0), Some(48.0), Some(50.0)));
        publish(&fx.store, "22", &quote(Some(41.0), Some(40.0), Some(42.0)));

        let outcome = fx.detector.evaluate("100").await;
        let SpreadOutcome::Result(result) = outcome else {
            panic!("expected result, got {outcome:?}");
        };
        assert_eq!(result.buy_leg, "11".into());
        assert_eq!(result.sell_leg, "22".into());
        assert_eq!(result.buy_ask_price, 50.0);
        assert_eq!(result.sell_bid_price, 40.0);
        assert_eq!(result.spread, 10.0);
        assert_eq!(result.profit, 1750.0);
        assert_eq!(result.instrument_name, "STOCK SPREAD");
        assert_eq!(result.expiry_dates, vec!["2025-02-28".to_string()]);

        // |12| > 10 and no open position: entry fires.
        let ledger = fx.ledger.lock().await;
        let positions = ledger.positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].spread_id, "100");
        assert_eq!(positions[0].buy_ticker_id, "11".into());
        assert_eq!(positions[0].buy_entry_price, 50.0);
        assert_eq!(positions[0].sell_entry_price, 40.0);
        assert_eq!(positions[0].buy_quantity, 175);
    }

    #[tokio::test]
    async fn test_roles_swap_on_non_positive_ltp() {
        let fx = fixture();
        // LTP negative: leg[1] becomes the buy leg (ask), leg[0] the sell leg (bid).
        publish(&fx.store, "100", &quote(Some(-12.0), None, None));
        publish(&fx.store, "11", &quote(None, Some(48.0), Some(50.0)));
        publish(&fx.store, "22", &quote(None, Some(40.0), Some(42.0)));

        let SpreadOutcome::Result(result) = fx.detector.evaluate("100").await else {
            panic!("expected result");
        };
        assert_eq!(result.buy_leg, "22".into());
        assert_eq!(result.sell_leg, "11".into());
        assert_eq!(result.buy_ask_price, 42.0);
        assert_eq!(result.sell_bid_price, 48.0);
        assert_eq!(result.spread, 6.0);
    }

    #[tokio::test]
    async fn test_zero_ltp_swaps_roles_and_never_enters() {
        let fx = fixture();
        publish(&fx.store, "100", &quote(Some(0.0), None, None));
        publish(&fx.store, "11", &quote(None, Some(48.0), Some(50.0)));
        publish(&fx.store, "22", &quote(None, Some(40.0), Some(42.0)));

        let SpreadOutcome::Result(result) = fx.detector.evaluate("100").await else {
            panic!("expected result");
        };
        // LTP <= 0 swaps roles.
        assert_eq!(result.buy_leg, "22".into());
        // LTP == 0 never satisfies the entry condition.
        let ledger = fx.ledger.lock().await;
        assert!(ledger.positions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_tick_does_not_duplicate_position() {
        let fx = fixture();
        publish(&fx.store, "100", &quote(Some(12.0), None, None));
        publish(&fx.store, "11", &quote(None, Some(48.0), Some(50.0)));
        publish(&fx.store, "22", &quote(None, Some(40.0), Some(42.0)));

        fx.detector.evaluate("100").await;
        fx.detector.evaluate("100").await;

        let ledger = fx.ledger.lock().await;
        assert_eq!(ledger.positions().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_entry_when_ltp_within_spread() {
        let fx = fixture();
        // |LTP| = 5 is not greater than the spread of 10.
        publish(&fx.store, "100", &quote(Some(5.0), None, None));
        publish(&fx.store, "11", &quote(None, None, Some(50.0)));
        publish(&fx.store, "22", &quote(None, Some(40.0), None));

        let SpreadOutcome::Result(result) = fx.detector.evaluate("100").await else {
            panic!("expected result");
        };
        assert_eq!(result.spread, 10.0);
        let ledger = fx.ledger.lock().await;
        assert!(ledger.positions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_primary_quote_is_error() {
        let fx = fixture();
        let outcome = fx.detector.evaluate("100").await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_missing_ltp_is_error() {
        let fx = fixture();
        publish(&fx.store, "100", &quote(None, Some(1.0), Some(2.0)));
        let SpreadOutcome::Failure { error } = fx.detector.evaluate("100").await else {
            panic!("expected failure");
        };
        assert!(error.contains("last traded price"), "{error}");
    }

    #[tokio::test]
    async fn test_wrong_leg_count_is_configuration_error() {
        let fx = fixture();
        publish(&fx.store, "200", &quote(Some(10.0), None, None));
        let SpreadOutcome::Failure { error } = fx.detector.evaluate("200").await else {
            panic!("expected failure");
        };
        assert!(error.contains("expected exactly 2"), "{error}");
    }

    #[tokio::test]
    async fn test_missing_leg_quote_is_error() {
        let fx = fixture();
        publish(&fx.store, "100", &quote(Some(12.0), None, None));
        publish(&fx.store, "11", &quote(None, None, Some(50.0)));
        // Leg 22 never published.
        let SpreadOutcome::Failure { error } = fx.detector.evaluate("100").await else {
            panic!("expected failure");
        };
        assert!(error.contains("22"), "{error}");

        let ledger = fx.ledger.lock().await;
        assert!(ledger.positions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spread_is_non_negative_and_unconfigured_lot_gives_zero_profit() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SegmentStore::new(dir.path()));
        let ledger = Arc::new(Mutex::new(PositionLedger::new(
            dir.path().join("positions.json"),
        )));
        let mut legs = HashMap::new();
        legs.insert("100".to_string(), vec!["11".into(), "22".into()]);
        // No lot sizes configured at all.
        let detector = SpreadDetector::new(
            store.clone(),
            ledger,
            SpreadMapping::new(legs),
            InstrumentCatalog::default(),
            Arc::new(MetricsCollector::new()),
        );

        publish(&store, "100", &quote(Some(100.0), None, None));
        // Sell bid below buy ask: raw difference is negative.
        publish(&store, "11", &quote(None, None, Some(50.0)));
        publish(&store, "22", &quote(None, Some(40.0), None));

        let SpreadOutcome::Result(result) = detector.evaluate("100").await else {
            panic!("expected result");
        };
        assert!(result.spread >= 0.0);
        assert_eq!(result.spread, 10.0);
        assert_eq!(result.profit, 0.0);
    }

    #[test]
    fn test_outcome_serialization_shapes() {
        let failure = SpreadOutcome::failure("no quote in shared memory for spread 999");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(
            json["error"],
            "no quote in shared memory for spread 999"
        );

        let result = SpreadOutcome::Result(SpreadResult {
            ltp: 12.0,
            instrument_name: "X".to_string(),
            buy_leg: "11".into(),
            sell_leg: "22".into(),
            buy_ask_price: 50.0,
            sell_bid_price: 40.0,
            spread: 10.0,
            profit: 1750.0,
            expiry_dates: vec![],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["LTP"], 12.0);
        assert_eq!(json["buy_leg"], "11");
        assert!(json.get("error").is_none());
    }
}
