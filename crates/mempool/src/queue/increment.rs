//! Increment-cursor queue (experimental)

use crossbeam::utils::CachePadded;

use super::{IndexQueue, QueueKind, check_capacity};
use crate::error::PoolResult;
use crate::stats::QueueCounters;
use crate::sync::{AtomicI64, AtomicUsize, Ordering};

/// Fetch-and-add queue with separate claimed and confirmed cursors.
///
/// Producers bump the claimed write cursor `w` unconditionally and roll it
/// back when the queue turns out to be full; consumers do the same with
/// `r`. Completed operations are counted in the confirmed cursors `cw` and
/// `cr`, which is what the other side compares against.
///
/// **Not linearizable under concurrency.** The confirmed counters count
/// completions, not positions: with two producers in flight, the second can
/// confirm before the first has written its cell, and a consumer will read
/// the unwritten cell. Rollbacks can also race with claims from other
/// threads. Single-threaded behaviour is exact, and the type is kept as a
/// benchmark reference for the cost of the CAS-based queues. Do not put it
/// under a [`Pool`](crate::Pool) that is shared between threads.
pub struct IncrementQueue {
    w: CachePadded<AtomicI64>,
    cw: CachePadded<AtomicI64>,
    r: CachePadded<AtomicI64>,
    cr: CachePadded<AtomicI64>,
    ring: Box<[AtomicUsize]>,
    capacity: usize,
    counters: QueueCounters,
}

impl IncrementQueue {
    #[inline]
    fn cell(&self, cursor: i64) -> &AtomicUsize {
        &self.ring[cursor.rem_euclid(self.capacity as i64) as usize]
    }
}

impl IndexQueue for IncrementQueue {
    fn with_capacity(capacity: usize) -> PoolResult<Self> {
        check_capacity(QueueKind::Increment, capacity, i64::MAX as usize / 2)?;

        Ok(Self {
            w: CachePadded::new(AtomicI64::new(0)),
            cw: CachePadded::new(AtomicI64::new(0)),
            r: CachePadded::new(AtomicI64::new(0)),
            cr: CachePadded::new(AtomicI64::new(0)),
            ring: (0..capacity).map(|_| AtomicUsize::new(0)).collect(),
            capacity,
            counters: QueueCounters::new(),
        })
    }

    /// Rollbacks are recorded as push failures.
    fn try_push(&self, index: usize) -> bool {
        let w = self.w.fetch_add(1, Ordering::AcqRel) + 1;
        let cr = self.cr.load(Ordering::Acquire);
        if w - cr > self.capacity as i64 {
            self.w.fetch_sub(1, Ordering::AcqRel);
            self.counters.record_push_failure();
            return false;
        }

        self.cell(w - 1).store(index, Ordering::Release);
        self.cw.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Rollbacks are recorded as pop failures.
    fn try_pop(&self) -> Option<usize> {
        let r = self.r.fetch_add(1, Ordering::AcqRel);
        let cw = self.cw.load(Ordering::Acquire);
        if r >= cw {
            self.r.fetch_sub(1, Ordering::AcqRel);
            self.counters.record_pop_failure();
            return None;
        }

        let value = self.cell(r).load(Ordering::Acquire);
        self.cr.fetch_add(1, Ordering::AcqRel);
        Some(value)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        let cr = self.cr.load(Ordering::Acquire);
        let cw = self.cw.load(Ordering::Acquire);
        (cw - cr).clamp(0, self.capacity as i64) as usize
    }

    fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Increment
    }
}

impl core::fmt::Debug for IncrementQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IncrementQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
