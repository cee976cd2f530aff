//! Static spread configuration
//!
//! A spread id is the "primary" instrument whose own traded price is the
//! basis signal for a configured pair of legs. The mapping and the
//! instrument catalog (display names, lot sizes, expiry dates) are loaded
//! once at startup and never mutated.

use crate::core::InstrumentId;
use std::collections::HashMap;

/// Display name used when the catalog has no entry for an instrument.
pub const UNKNOWN_INSTRUMENT: &str = "Unknown Instrument";

/// Spread id -> ordered leg instrument ids.
///
/// Leg order encodes the ask/bid role under a positive basis, not a semantic
/// buy/sell: the detector swaps roles when the primary LTP is non-positive.
#[derive(Debug, Clone, Default)]
pub struct SpreadMapping {
    legs: HashMap<String, Vec<InstrumentId>>,
}

impl SpreadMapping {
    pub fn new(legs: HashMap<String, Vec<InstrumentId>>) -> Self {
        Self { legs }
    }

    /// All configured spread ids.
    pub fn spread_ids(&self) -> impl Iterator<Item = &str> {
        self.legs.keys().map(|s| s.as_str())
    }

    /// Configured legs for a spread id, in configuration order.
    /// Validity (exactly two legs) is the detector's call to make,
    /// since a bad entry is a per-spread error rather than a load failure.
    pub fn legs(&self, spread_id: &str) -> Option<&[InstrumentId]> {
        self.legs.get(spread_id).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }
}

/// Instrument metadata: display names, lot sizes, expiry dates.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    names: HashMap<String, String>,
    lot_sizes: HashMap<String, u32>,
    expiry_dates: Vec<String>,
}

impl InstrumentCatalog {
    pub fn new(
        names: HashMap<String, String>,
        lot_sizes: HashMap<String, u32>,
        expiry_dates: Vec<String>,
    ) -> Self {
        Self {
            names,
            lot_sizes,
            expiry_dates,
        }
    }

    /// Display name for an instrument, with a stable fallback.
    pub fn name_of(&self, id: &InstrumentId) -> String {
        self.names
            .get(id.as_str())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_INSTRUMENT.to_string())
    }

    /// Lot size for an instrument. Unconfigured instruments trade a lot size
    /// of 0, which yields a profit estimate of 0 rather than an error.
    pub fn lot_size(&self, id: &InstrumentId) -> u32 {
        self.lot_sizes.get(id.as_str()).copied().unwrap_or(0)
    }

    /// Contract expiry dates (ISO `YYYY-MM-DD`), attached to every result.
    pub fn expiry_dates(&self) -> &[String] {
        &self.expiry_dates
    }
}
