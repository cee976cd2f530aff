//! Replay quotes into the shared-memory segment store.
//!
//! Stands in for the external market-data producer during development:
//! reads a replay file of quote frames and publishes each frame into the
//! segment store on a fixed interval, looping when the file is exhausted.
//!
//! Replay file format: a JSON array of frames, each frame a map of
//! instrument id to quote object.
//!
//! Usage: quote-publisher [replay-file] [shm-dir] [interval-ms]

use anyhow::Context;
use spread_core::core::Quote;
use spread_core::shm::SegmentStore;
use std::collections::HashMap;
use std::time::Duration;

type Frame = HashMap<String, Quote>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let replay_path = args.next().unwrap_or_else(|| "quotes.json".to_string());
    let shm_dir = args.next().unwrap_or_else(|| "/dev/shm".to_string());
    let interval_ms: u64 = match args.next() {
        Some(raw) => raw.parse().context("interval-ms must be an integer")?,
        None => 1000,
    };

    let contents = std::fs::read_to_string(&replay_path)
        .with_context(|| format!("failed to read replay file {replay_path}"))?;
    let frames: Vec<Frame> =
        serde_json::from_str(&contents).context("replay file is not a JSON array of frames")?;
    anyhow::ensure!(!frames.is_empty(), "replay file contains no frames");

    let store = SegmentStore::new(&shm_dir);
    tracing::info!(
        frames = frames.len(),
        shm_dir,
        interval_ms,
        "replaying quotes"
    );

    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    for frame in frames.iter().cycle() {
        interval.tick().await;
        for (instrument_id, quote) in frame {
            let id = instrument_id.as_str().into();
            if let Err(e) = store.publish(&id, quote) {
                tracing::error!(instrument = %id, error = %e, "publish failed");
            }
        }
        tracing::debug!(instruments = frame.len(), "frame published");
    }

    Ok(())
}
