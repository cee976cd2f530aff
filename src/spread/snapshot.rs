//! Per-tick result snapshot
//!
//! All spread outcomes for a tick are collected into one map keyed by
//! spread-id string and rewritten wholesale. Only the latest snapshot is
//! retained; there is no history.

use crate::spread::SpreadOutcome;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

/// Snapshot of the latest tick: spread id -> outcome.
pub type SnapshotMap = BTreeMap<String, SpreadOutcome>;

/// Writes the replacement snapshot to its backing file.
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rewrite the snapshot file with this tick's outcomes.
    pub fn write(&self, snapshot: &SnapshotMap) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, bytes)
    }

    /// Load the last persisted snapshot, if any.
    pub fn load(&self) -> io::Result<SnapshotMap> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SnapshotMap::new()),
            Err(e) => Err(e),
        }
    }
}
