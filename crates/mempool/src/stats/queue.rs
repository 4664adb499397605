//! Contention counters for the free-index queues

use core::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// CAS retry counters shared by every [`IndexQueue`](crate::queue::IndexQueue)
/// implementation.
///
/// A "failure" here is a lost CAS race that the queue retried internally;
/// it never reaches the caller. Benchmarks read these to compare how much
/// contention each algorithm absorbs.
#[derive(Debug, Default)]
pub struct QueueCounters {
    push_failed: CachePadded<AtomicU64>,
    pop_failed: CachePadded<AtomicU64>,
}

/// Point-in-time copy of [`QueueCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCountersSnapshot {
    pub push_failed: u64,
    pub pop_failed: u64,
}

impl core::ops::AddAssign for QueueCountersSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.push_failed += other.push_failed;
        self.pop_failed += other.pop_failed;
    }
}

impl QueueCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_push_failure(&self) {
        self.push_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_pop_failure(&self) {
        self.pop_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Lost CAS races on the push path
    pub fn push_failed(&self) -> u64 {
        self.push_failed.load(Ordering::Relaxed)
    }

    /// Lost CAS races on the pop path
    pub fn pop_failed(&self) -> u64 {
        self.pop_failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> QueueCountersSnapshot {
        QueueCountersSnapshot {
            push_failed: self.push_failed(),
            pop_failed: self.pop_failed(),
        }
    }

    /// Zero both counters, e.g. between benchmark rounds
    pub fn reset(&self) {
        self.push_failed.store(0, Ordering::Relaxed);
        self.pop_failed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_record_and_reset() {
        let counters = QueueCounters::new();
        counters.record_push_failure();
        counters.record_push_failure();
        counters.record_pop_failure();

        assert_eq!(
            counters.snapshot(),
            QueueCountersSnapshot {
                push_failed: 2,
                pop_failed: 1,
            }
        );

        counters.reset();
        assert_eq!(counters.snapshot(), QueueCountersSnapshot::default());
    }
}
