//! Spread detection
//!
//! Per-spread-id evaluation of the two-leg basis, entry gating against the
//! position ledger, and the per-tick replacement snapshot.

pub mod detector;
pub mod snapshot;

pub use detector::{SpreadDetector, SpreadOutcome, SpreadResult};
pub use snapshot::{SnapshotMap, SnapshotWriter};
