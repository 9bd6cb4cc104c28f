//! Per-stream capture counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by one stream's capture callback, queue and writer.
///
/// The callback side only ever does relaxed increments, so it stays safe to
/// touch from the driver's receive context.
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    pub enqueued: AtomicU64,
    pub dropped: AtomicU64,
    pub malformed: AtomicU64,
    pub written: AtomicU64,
    pub write_failures: AtomicU64,
    pub syncs: AtomicU64,
}

impl StreamCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StreamStats {
        StreamStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            syncs: self.syncs.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics for one capture stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Records accepted by the capture queue.
    pub enqueued: u64,
    /// Records discarded because the queue was full.
    pub dropped: u64,
    /// Driver deliveries that could not be turned into a record.
    pub malformed: u64,
    /// Records appended to the log.
    pub written: u64,
    /// Record writes or flushes that failed.
    pub write_failures: u64,
    /// Completed durability syncs.
    pub syncs: u64,
}

impl StreamStats {
    /// Records accepted but not yet written (or lost at shutdown).
    pub fn pending(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.written)
            .saturating_sub(self.write_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let counters = StreamCounters::new();
        counters.enqueued.fetch_add(5, Ordering::Relaxed);
        counters.dropped.fetch_add(2, Ordering::Relaxed);
        counters.written.fetch_add(3, Ordering::Relaxed);

        let stats = counters.snapshot();
        assert_eq!(stats.enqueued, 5);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.written, 3);
        assert_eq!(stats.pending(), 2);
    }

    #[test]
    fn test_pending_never_underflows() {
        let stats = StreamStats {
            written: 4,
            ..Default::default()
        };
        assert_eq!(stats.pending(), 0);
    }
}
