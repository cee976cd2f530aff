//! Core domain types
//!
//! This module contains the fundamental types used throughout the system:
//! - InstrumentId: identifier for a tradable instrument
//! - Quote: latest market data payload for one instrument
//! - SpreadMapping: static spread id -> two ordered leg ids

pub mod mapping;
pub mod quote;

pub use mapping::{InstrumentCatalog, SpreadMapping};
pub use quote::{InstrumentId, PriceLevel, Quote, Touchline};
