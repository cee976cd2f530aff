//! Shared-memory quote bus
//!
//! One fixed-capacity named region per instrument, written by a single
//! producer process and read by any number of consumer processes. Regions
//! are plain files in a shared-memory directory (default `/dev/shm`, where
//! POSIX shared memory lives) mapped with `memmap2`, named `shm_<id>`.
//!
//! There is deliberately no synchronization between the writer and readers:
//! a reader may observe a region mid-write, and the JSON parse failing (and
//! collapsing to "absent") is the sole consistency mechanism. This is a
//! latency/consistency trade-off carried over from the producer protocol;
//! do not add locking here.

use crate::core::{InstrumentId, Quote};
use memmap2::{Mmap, MmapMut};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Fixed capacity of every segment, in bytes.
pub const SEGMENT_CAPACITY: usize = 4096;

/// Writer/reader for per-instrument shared-memory segments.
///
/// The writer-side mapping handles live in an explicit registry owned by the
/// store, so segment lifecycle is bound to this object rather than to
/// process-wide mutable state. Exactly one `SegmentStore` should publish a
/// given instrument at a time; reads are safe from any number of stores.
pub struct SegmentStore {
    dir: PathBuf,
    segments: Mutex<HashMap<InstrumentId, MmapMut>>,
}

impl SegmentStore {
    /// Create a store over the given shared-memory directory.
    /// The directory must already exist (it does on any Linux with tmpfs).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            segments: Mutex::new(HashMap::new()),
        }
    }

    /// Filesystem path of an instrument's segment.
    pub fn path_for(&self, id: &InstrumentId) -> PathBuf {
        self.dir.join(format!("shm_{id}"))
    }

    /// Publish the latest quote for an instrument (last value wins).
    ///
    /// Creates the region on first publish, reuses the mapped handle after.
    /// A payload longer than [`SEGMENT_CAPACITY`] is truncated and a warning
    /// recorded; truncation is a documented lossy policy, not an error. The
    /// payload is followed by zero-fill so readers can find its end at the
    /// first zero byte.
    pub fn publish(&self, id: &InstrumentId, quote: &Quote) -> io::Result<()> {
        let encoded = serde_json::to_vec(quote)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut segments = self.segments.lock();
        let mmap = match segments.get_mut(id) {
            Some(mmap) => mmap,
            None => {
                let mmap = self.create_segment(id)?;
                segments.entry(id.clone()).or_insert(mmap)
            }
        };

        let len = if encoded.len() > SEGMENT_CAPACITY {
            tracing::warn!(
                instrument = %id,
                payload_len = encoded.len(),
                capacity = SEGMENT_CAPACITY,
                "quote payload exceeds segment capacity, truncating"
            );
            SEGMENT_CAPACITY
        } else {
            encoded.len()
        };

        mmap[..len].copy_from_slice(&encoded[..len]);
        mmap[len..].fill(0);
        Ok(())
    }

    /// Read the latest quote for an instrument.
    ///
    /// Every failure mode — region missing, empty payload, torn or garbled
    /// data — collapses uniformly to `None`. Market-data unavailability must
    /// never abort a computation, so this cannot return an error.
    pub fn read(&self, id: &InstrumentId) -> Option<Quote> {
        let path = self.path_for(id);
        let file = File::open(&path).ok()?;
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(instrument = %id, error = %e, "failed to map segment");
                return None;
            }
        };

        let buf = &mmap[..mmap.len().min(SEGMENT_CAPACITY)];
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        if end == 0 {
            return None;
        }

        match serde_json::from_slice(&buf[..end]) {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::debug!(instrument = %id, error = %e, "unparsable segment payload");
                None
            }
        }
    }

    /// Whether a segment currently exists for the instrument.
    pub fn exists(&self, id: &InstrumentId) -> bool {
        self.path_for(id).exists()
    }

    /// Drop all writer-side handles and delete the backing regions.
    /// Producer teardown only; readers simply see the regions as absent.
    pub fn teardown(&self) {
        let mut segments = self.segments.lock();
        for (id, mmap) in segments.drain() {
            drop(mmap);
            let _ = std::fs::remove_file(self.path_for(&id));
        }
    }

    fn create_segment(&self, id: &InstrumentId) -> io::Result<MmapMut> {
        let path = self.path_for(id);
        let file = open_sized(&path)?;
        // Safety: the file is sized to SEGMENT_CAPACITY and kept open by the
        // mapping; concurrent readers tolerate torn contents by design.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        tracing::debug!(instrument = %id, path = %path.display(), "created shared-memory segment");
        Ok(mmap)
    }
}

/// Open (creating if absent) a region file and ensure it spans the full
/// capacity. An existing region is reused as-is.
fn open_sized(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    if file.metadata()?.len() != SEGMENT_CAPACITY as u64 {
        file.set_len(SEGMENT_CAPACITY as u64)?;
    }
    Ok(file)
}
