//! Bounded hand-off queue between a capture callback and its writer.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tokio::sync::Notify;

use crate::stats::StreamCounters;

/// Producer half, owned by the capture callback.
///
/// Slots are allocated once when the queue is created; `try_enqueue` only
/// copies into a free slot.
pub(crate) struct QueueProducer<T> {
    inner: HeapProd<T>,
    ready: Arc<Notify>,
    counters: Arc<StreamCounters>,
}

/// Consumer half, owned by the writer task.
pub(crate) struct QueueConsumer<T> {
    inner: HeapCons<T>,
    ready: Arc<Notify>,
}

/// Creates a queue holding at most `capacity` records.
///
/// Capacity is validated non-zero by the configuration; a zero here is
/// treated as one.
pub(crate) fn capture_queue<T: Copy + Send>(
    capacity: usize,
    counters: Arc<StreamCounters>,
) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (inner_prod, inner_cons) = HeapRb::<T>::new(capacity.max(1)).split();
    let ready = Arc::new(Notify::new());

    (
        QueueProducer {
            inner: inner_prod,
            ready: Arc::clone(&ready),
            counters,
        },
        QueueConsumer {
            inner: inner_cons,
            ready,
        },
    )
}

impl<T: Copy + Send> QueueProducer<T> {
    /// Attempts to enqueue without blocking.
    ///
    /// Returns `false` if the queue is full; the record is dropped and
    /// counted.
    pub fn try_enqueue(&mut self, record: T) -> bool {
        match self.inner.try_push(record) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                self.ready.notify_one();
                true
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Counts a driver delivery that produced no record.
    pub fn count_malformed(&self) {
        self.counters.malformed.fetch_add(1, Ordering::Relaxed);
    }
}

impl<T: Copy + Send> QueueConsumer<T> {
    /// Waits until a record is available and returns it in enqueue order.
    ///
    /// Cancel safe: dropping the future never loses a record.
    pub async fn dequeue_blocking(&mut self) -> T {
        loop {
            if let Some(record) = self.inner.try_pop() {
                return record;
            }
            // notify_one stores a permit when nobody is waiting, so a push
            // between try_pop and here still wakes us.
            self.ready.notified().await;
        }
    }

    /// Number of records waiting.
    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn queue(capacity: usize) -> (QueueProducer<u32>, QueueConsumer<u32>, Arc<StreamCounters>) {
        let counters = Arc::new(StreamCounters::new());
        let (producer, consumer) = capture_queue(capacity, Arc::clone(&counters));
        (producer, consumer, counters)
    }

    #[test]
    fn test_exactly_capacity_enqueues_succeed() {
        for (attempts, capacity) in [(3usize, 5usize), (5, 5), (12, 5), (1, 1), (0, 4)] {
            let (mut producer, consumer, counters) = queue(capacity);

            let accepted = (0..attempts as u32)
                .filter(|i| producer.try_enqueue(*i))
                .count();

            assert_eq!(accepted, attempts.min(capacity));
            assert_eq!(consumer.len(), attempts.min(capacity));
            let stats = counters.snapshot();
            assert_eq!(stats.enqueued as usize, attempts.min(capacity));
            assert_eq!(stats.dropped as usize, attempts.saturating_sub(capacity));
        }
    }

    #[tokio::test]
    async fn test_overflow_keeps_earliest_records_in_order() {
        let (mut producer, mut consumer, _) = queue(3);
        for i in 0..6 {
            producer.try_enqueue(i);
        }

        assert_eq!(consumer.dequeue_blocking().await, 0);
        assert_eq!(consumer.dequeue_blocking().await, 1);
        assert_eq!(consumer.dequeue_blocking().await, 2);
        assert_eq!(consumer.len(), 0);
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_enqueue() {
        let (mut producer, mut consumer, _) = queue(4);

        let waiter = tokio::spawn(async move { consumer.dequeue_blocking().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(producer.try_enqueue(42));

        let value = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("dequeue did not wake")
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_dequeue_blocks_on_empty_queue() {
        let (_producer, mut consumer, _) = queue(4);
        let result =
            tokio::time::timeout(Duration::from_millis(20), consumer.dequeue_blocking()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_counted_separately() {
        let (producer, _consumer, counters) = queue(2);
        producer.count_malformed();
        let stats = counters.snapshot();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.dropped, 0);
    }
}
