//! Capture callbacks installed into the radio driver.
//!
//! Each callback copies the transient driver buffer into a fixed-size record
//! and hands it to the stream's queue. They run in the driver's receive
//! context: no allocation, no logging, no I/O, no waiting.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::pipeline::queue::QueueProducer;
use crate::radio::{CsiCallback, FrameCallback, RxCsi, RxFrame};
use crate::{CsiRecord, FrameRecord, TimestampSource};

/// Time since the Unix epoch, or zero if the system clock is before it.
pub(crate) fn unix_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

/// Produces record timestamps.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CaptureClock {
    source: TimestampSource,
    epoch: Instant,
}

impl CaptureClock {
    /// A clock whose monotonic epoch is now.
    pub fn new(source: TimestampSource) -> Self {
        Self {
            source,
            epoch: Instant::now(),
        }
    }

    /// Microseconds since the epoch, or Unix milliseconds for wall-clock time.
    pub fn now(&self) -> i64 {
        let elapsed = match self.source {
            TimestampSource::Monotonic => self.epoch.elapsed().as_micros(),
            TimestampSource::WallClock => unix_time().as_millis(),
        };
        i64::try_from(elapsed).unwrap_or(i64::MAX)
    }
}

/// Builds the frame receive callback for `producer`.
///
/// A delivery with no bytes is counted as malformed.
pub(crate) fn frame_callback(
    mut producer: QueueProducer<FrameRecord>,
    clock: CaptureClock,
) -> FrameCallback {
    Box::new(move |rx: &RxFrame<'_>| {
        match FrameRecord::from_raw(rx.payload, rx.sig_len, clock.now(), rx.rssi, rx.channel) {
            Some(record) => {
                // A full queue is a counted drop, never retried.
                producer.try_enqueue(record);
            }
            None => producer.count_malformed(),
        }
    })
}

/// Builds the CSI receive callback for `producer`.
pub(crate) fn csi_callback(mut producer: QueueProducer<CsiRecord>, clock: CaptureClock) -> CsiCallback {
    Box::new(move |rx: &RxCsi<'_>| {
        let record = CsiRecord::from_raw(rx.data, rx.mac, clock.now(), rx.rssi, rx.channel);
        producer.try_enqueue(record);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::capture_queue;
    use crate::stats::StreamCounters;
    use crate::{FrameClass, MacAddress, PAYLOAD_CAPACITY};
    use std::sync::Arc;

    #[test]
    fn test_monotonic_clock_counts_from_epoch() {
        let clock = CaptureClock::new(TimestampSource::Monotonic);
        let t = clock.now();
        assert!(t >= 0);
        assert!(t < 1_000_000, "monotonic clock should start near zero");
    }

    #[test]
    fn test_wall_clock_is_unix_millis() {
        let clock = CaptureClock::new(TimestampSource::WallClock);
        // 2020-01-01 in Unix milliseconds
        assert!(clock.now() > 1_577_836_800_000);
    }

    #[tokio::test]
    async fn test_frame_callback_enqueues_record() {
        let counters = Arc::new(StreamCounters::new());
        let (producer, mut consumer) = capture_queue(4, Arc::clone(&counters));
        let mut callback = frame_callback(producer, CaptureClock::new(TimestampSource::Monotonic));

        let raw = [0x80u8; 200];
        callback(&RxFrame {
            payload: &raw,
            sig_len: 200,
            rssi: -61,
            channel: 6,
        });

        let record = consumer.dequeue_blocking().await;
        assert_eq!(record.class, FrameClass::Management);
        assert_eq!(record.subtype, 8);
        assert_eq!(record.rssi, -61);
        assert_eq!(record.channel, 6);
        assert_eq!(usize::from(record.payload_len), PAYLOAD_CAPACITY);
        assert_eq!(counters.snapshot().enqueued, 1);
    }

    #[test]
    fn test_empty_frame_counted_as_malformed() {
        let counters = Arc::new(StreamCounters::new());
        let (producer, consumer) = capture_queue::<FrameRecord>(4, Arc::clone(&counters));
        let mut callback = frame_callback(producer, CaptureClock::new(TimestampSource::Monotonic));

        callback(&RxFrame {
            payload: &[],
            sig_len: 0,
            rssi: -70,
            channel: 1,
        });

        assert_eq!(consumer.len(), 0);
        assert_eq!(counters.snapshot().malformed, 1);
    }

    #[test]
    fn test_full_queue_drops_csi() {
        let counters = Arc::new(StreamCounters::new());
        let (producer, consumer) = capture_queue::<CsiRecord>(2, Arc::clone(&counters));
        let mut callback = csi_callback(producer, CaptureClock::new(TimestampSource::Monotonic));

        let sample = [3u8; 384];
        for _ in 0..5 {
            callback(&RxCsi {
                mac: MacAddress::new([1, 2, 3, 4, 5, 6]),
                rssi: -40,
                channel: 11,
                data: &sample,
            });
        }

        assert_eq!(consumer.len(), 2);
        let stats = counters.snapshot();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped, 3);
    }
}
