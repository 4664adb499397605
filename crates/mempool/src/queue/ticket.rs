//! Ticket queue: CAS-advanced cursors with per-cell publish stamps

use crossbeam::utils::{Backoff, CachePadded};

use super::{IndexQueue, QueueKind, check_capacity};
use crate::error::PoolResult;
use crate::stats::QueueCounters;
use crate::sync::{self, AtomicUsize, Ordering};

/// Stamp value of a cell that holds nothing publishable.
const UNPUBLISHED: usize = 0;

struct Cell {
    value: AtomicUsize,
    /// `cursor + 1` of the push that last published into this cell, or
    /// [`UNPUBLISHED`]. Stamping the cursor rather than a bare flag lets a
    /// consumer tell "published for my lap" from "published for a later lap".
    stamp: AtomicUsize,
}

impl Cell {
    fn new() -> Self {
        Self {
            value: AtomicUsize::new(0),
            stamp: AtomicUsize::new(UNPUBLISHED),
        }
    }
}

/// Bounded MPMC index queue built from two monotonic cursors.
///
/// A producer claims ring position `w` by CAS-ing the write cursor from `w`
/// to `w + 1`, then writes the value and publishes the cell with a release
/// store of its stamp. A consumer only advances the read cursor over a cell
/// whose stamp is published for its lap, so a position that has been
/// claimed but not yet written is never read.
///
/// `try_pop` does not wait for a slow producer: if the head cell is claimed
/// but unpublished it reports `None` immediately, so consumers never stall
/// behind a preempted producer.
pub struct TicketQueue {
    w: CachePadded<AtomicUsize>,
    r: CachePadded<AtomicUsize>,
    ring: Box<[Cell]>,
    capacity: usize,
    counters: QueueCounters,
}

impl TicketQueue {
    #[inline]
    fn cell(&self, cursor: usize) -> &Cell {
        &self.ring[cursor % self.capacity]
    }
}

impl IndexQueue for TicketQueue {
    fn with_capacity(capacity: usize) -> PoolResult<Self> {
        check_capacity(QueueKind::Ticket, capacity, usize::MAX / 2)?;

        Ok(Self {
            w: CachePadded::new(AtomicUsize::new(0)),
            r: CachePadded::new(AtomicUsize::new(0)),
            ring: (0..capacity).map(|_| Cell::new()).collect(),
            capacity,
            counters: QueueCounters::new(),
        })
    }

    fn try_push(&self, index: usize) -> bool {
        let backoff = Backoff::new();
        loop {
            // `w` before `r`: a fresher `r` can only under-count the queue,
            // and the CAS below re-validates `w`.
            let w = self.w.load(Ordering::Acquire);
            let r = self.r.load(Ordering::Acquire);
            if w.saturating_sub(r) >= self.capacity {
                return false;
            }

            match self
                .w
                .compare_exchange_weak(w, w + 1, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    // The consumer of this cell's previous lap read its value
                    // before advancing `r`, and we observed that advance.
                    let cell = self.cell(w);
                    cell.value.store(index, Ordering::Relaxed);
                    cell.stamp.store(w + 1, Ordering::Release);
                    return true;
                }
                Err(_) => {
                    self.counters.record_push_failure();
                    sync::spin(&backoff);
                }
            }
        }
    }

    fn try_pop(&self) -> Option<usize> {
        let backoff = Backoff::new();
        loop {
            let r = self.r.load(Ordering::Acquire);
            let w = self.w.load(Ordering::Acquire);
            if r >= w {
                return None;
            }

            let cell = self.cell(r);
            if cell.stamp.load(Ordering::Acquire) != r + 1 {
                if self.r.load(Ordering::Acquire) != r {
                    // Someone else consumed this position; look again.
                    continue;
                }
                // Claimed by a producer that has not published yet.
                return None;
            }

            // Read before claiming: once `r` moves, a producer of the next
            // lap may overwrite the cell.
            let value = cell.value.load(Ordering::Relaxed);
            match self
                .r
                .compare_exchange_weak(r, r + 1, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    // Only clear our own lap's stamp; a next-lap producer may
                    // already have published.
                    let _ = cell.stamp.compare_exchange(
                        r + 1,
                        UNPUBLISHED,
                        Ordering::Release,
                        Ordering::Relaxed,
                    );
                    return Some(value);
                }
                Err(_) => {
                    self.counters.record_pop_failure();
                    sync::spin(&backoff);
                }
            }
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        let r = self.r.load(Ordering::Acquire);
        let w = self.w.load(Ordering::Acquire);
        w.saturating_sub(r).min(self.capacity)
    }

    fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Ticket
    }
}

impl core::fmt::Debug for TicketQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TicketQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
