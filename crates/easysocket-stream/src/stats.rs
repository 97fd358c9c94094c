use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by a running reader.
#[derive(Debug, Default)]
pub struct ReaderStats {
    bytes: AtomicU64,
    frames: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    decode_errors: AtomicU64,
}

/// Point-in-time copy of [`ReaderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Bytes read from the input.
    pub bytes: u64,
    /// Complete frames cut from the stream.
    pub frames: u64,
    /// Decoded items handed to the dispatch pool.
    pub dispatched: u64,
    /// Decoded items discarded because no consumer was registered.
    pub dropped: u64,
    /// Frames the codec rejected.
    pub decode_errors: u64,
}

impl ReaderStats {
    pub(crate) fn add_bytes(&self, n: usize) {
        self.bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes: self.bytes.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}
