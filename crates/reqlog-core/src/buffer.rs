//! Bounded record buffer with drop-oldest overflow.
//!
//! Producers never wait on I/O and are never rejected: when the buffer is
//! full the oldest record is evicted to make room. Under sustained overload
//! this silently discards the oldest unobserved records; the loss is counted
//! in [`BufferStats::dropped`].

use crate::record::Record;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Thread-safe FIFO of records with a fixed capacity.
pub struct RecordBuffer {
    records: Mutex<VecDeque<Record>>,
    capacity: usize,
    pushed: AtomicU64,
    dropped: AtomicU64,
    drained: AtomicU64,
}

/// Counters describing buffer activity since creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BufferStats {
    /// Records currently buffered
    pub buffered: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Total records enqueued
    pub pushed: u64,
    /// Total records evicted on overflow
    pub dropped: u64,
    /// Total records removed by drains
    pub drained: u64,
}

impl RecordBuffer {
    /// Create a buffer holding at most `capacity` records.
    ///
    /// A capacity of zero is rejected by
    /// [`RuntimeConfig::validate`](crate::RuntimeConfig::validate); if used
    /// directly, it behaves as a capacity of one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            drained: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave the deque inconsistent,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Record>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a record, evicting the oldest ones while at capacity.
    ///
    /// Returns the number of evicted records.
    pub fn enqueue(&self, record: Record) -> usize {
        let mut records = self.lock();
        let mut evicted = 0;
        while records.len() >= self.capacity {
            if records.pop_front().is_none() {
                break;
            }
            evicted += 1;
        }
        records.push_back(record);
        drop(records);

        self.pushed.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.dropped.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::trace!(evicted, "record buffer full, oldest records dropped");
        }
        evicted
    }

    /// Remove up to `max` records, oldest first. Never waits for records.
    pub fn dequeue_batch(&self, max: usize) -> Vec<Record> {
        let mut records = self.lock();
        let count = max.min(records.len());
        let batch: Vec<Record> = records.drain(..count).collect();
        drop(records);

        self.drained.fetch_add(batch.len() as u64, Ordering::Relaxed);
        batch
    }

    /// Number of buffered records. Advisory: it may change immediately.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the buffer counters.
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            buffered: self.len(),
            capacity: self.capacity,
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RecordBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn paths(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.path.clone()).collect()
    }

    #[test]
    fn test_enqueue_and_dequeue_fifo() {
        let buffer = RecordBuffer::new(10);
        for i in 0..5 {
            assert_eq!(buffer.enqueue(sample(&format!("/r{i}"), 200)), 0);
        }
        assert_eq!(buffer.len(), 5);

        let batch = buffer.dequeue_batch(3);
        assert_eq!(paths(&batch), vec!["/r0", "/r1", "/r2"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let buffer = RecordBuffer::new(3);
        let evicted: usize = (0..5)
            .map(|i| buffer.enqueue(sample(&format!("/r{i}"), 200)))
            .sum();

        assert_eq!(evicted, 2);
        assert_eq!(paths(&buffer.dequeue_batch(10)), vec!["/r2", "/r3", "/r4"]);

        let stats = buffer.stats();
        assert_eq!(stats.pushed, 5);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.drained, 3);
        assert_eq!(stats.buffered, 0);
    }

    #[test]
    fn test_dequeue_empty_returns_immediately() {
        let buffer = RecordBuffer::new(4);
        assert!(buffer.dequeue_batch(8).is_empty());
        assert!(buffer.dequeue_batch(0).is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let buffer = RecordBuffer::new(0);
        buffer.enqueue(sample("/a", 200));
        buffer.enqueue(sample("/b", 200));
        assert_eq!(paths(&buffer.dequeue_batch(5)), vec!["/b"]);
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        let buffer = Arc::new(RecordBuffer::new(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        buffer.enqueue(sample(&format!("/t{t}/{i}"), 200));
                        if i % 50 == 0 {
                            buffer.dequeue_batch(5);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = buffer.stats();
        assert!(stats.buffered <= 64);
        assert_eq!(stats.pushed, 4000);
        assert_eq!(
            stats.pushed,
            stats.buffered as u64 + stats.dropped + stats.drained
        );
    }

    proptest! {
        #[test]
        fn prop_retains_most_recent(capacity in 1usize..32, extra in 1usize..64) {
            let total = capacity + extra;
            let buffer = RecordBuffer::new(capacity);
            for i in 0..total {
                buffer.enqueue(sample(&format!("/r{i}"), 200));
            }

            let kept = paths(&buffer.dequeue_batch(total));
            let expected: Vec<String> = (extra..total).map(|i| format!("/r{i}")).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn prop_batch_never_exceeds_max(len in 0usize..50, max in 0usize..60) {
            let buffer = RecordBuffer::new(100);
            for i in 0..len {
                buffer.enqueue(sample(&format!("/r{i}"), 200));
            }
            let batch = buffer.dequeue_batch(max);
            prop_assert!(batch.len() <= max);
            prop_assert_eq!(batch.len(), len.min(max));
        }
    }
}
