//! Quote payload types
//!
//! The producer writes one JSON document per instrument into shared memory:
//! `{ Touchline: { LastTradedPrice }, Bids: [{Price}..], Asks: [{Price}..] }`.
//! Only the first (best) level of each side is consumed downstream. Fields
//! beyond that shape are tolerated and ignored so the feed can evolve without
//! breaking readers.

use serde::{Deserialize, Serialize};

/// Identifier of a tradable instrument.
///
/// Instrument ids arrive as numeric strings from configuration and name the
/// shared-memory region (`shm_<id>`), so they stay strings end to end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for InstrumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Top-of-book summary for an instrument.
///
/// `LastTradedPrice` is optional: an upstream tick can legitimately omit it,
/// and the detector reports that as a distinct error from a missing quote.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Touchline {
    #[serde(rename = "LastTradedPrice", default, skip_serializing_if = "Option::is_none")]
    pub last_traded_price: Option<f64>,
}

/// One price level of a book side. Only `Price` is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    #[serde(rename = "Price")]
    pub price: f64,
}

/// Latest quote for one instrument as published to shared memory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "Touchline", default, skip_serializing_if = "Option::is_none")]
    pub touchline: Option<Touchline>,

    #[serde(rename = "Bids", default)]
    pub bids: Vec<PriceLevel>,

    #[serde(rename = "Asks", default)]
    pub asks: Vec<PriceLevel>,
}

impl Quote {
    /// Last traded price, if the touchline carried one.
    /// May be zero or negative (calendar spreads trade through zero).
    pub fn ltp(&self) -> Option<f64> {
        self.touchline.as_ref().and_then(|t| t.last_traded_price)
    }

    /// Best (first) bid price, if any bid levels are present.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    /// Best (first) ask price, if any ask levels are present.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_quote() {
        let json = r#"{
            "Touchline": {"LastTradedPrice": 12.5},
            "Bids": [{"Price": 40.0}, {"Price": 39.5}],
            "Asks": [{"Price": 50.0}]
        }"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.ltp(), Some(12.5));
        assert_eq!(quote.best_bid(), Some(40.0));
        assert_eq!(quote.best_ask(), Some(50.0));
    }

    #[test]
    fn test_parse_negative_ltp() {
        let json = r#"{"Touchline": {"LastTradedPrice": -3.25}, "Bids": [], "Asks": []}"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.ltp(), Some(-3.25));
        assert_eq!(quote.best_bid(), None);
        assert_eq!(quote.best_ask(), None);
    }

    #[test]
    fn test_missing_touchline_is_not_a_parse_error() {
        let quote: Quote = serde_json::from_str(r#"{"Bids": [{"Price": 1.0}]}"#).unwrap();
        assert_eq!(quote.ltp(), None);
        assert_eq!(quote.best_bid(), Some(1.0));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "ExchangeInstrumentID": 42541,
            "MessageCode": 1502,
            "Touchline": {"LastTradedPrice": 7.0},
            "Bids": [{"Price": 6.9, "Size": 100}],
            "Asks": [{"Price": 7.1, "Size": 50}]
        }"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.ltp(), Some(7.0));
        assert_eq!(quote.best_bid(), Some(6.9));
        assert_eq!(quote.best_ask(), Some(7.1));
    }

    #[test]
    fn test_roundtrip() {
        let quote = Quote {
            touchline: Some(Touchline {
                last_traded_price: Some(100.0),
            }),
            bids: vec![PriceLevel { price: 99.5 }],
            asks: vec![PriceLevel { price: 100.5 }],
        };
        let json = serde_json::to_string(&quote).unwrap();
        let back: Quote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, quote);
    }
}
