//! Packed-cursor queue: both cursors in one `AtomicU64`

use crossbeam::utils::{Backoff, CachePadded};

use super::{IndexQueue, QueueKind, check_capacity};
use crate::error::PoolResult;
use crate::stats::QueueCounters;
use crate::sync::{self, AtomicU64, AtomicUsize, Ordering};

/// Largest capacity a [`PackedQueue`] accepts.
///
/// The ring holds one spare cell, and the ring length has to fit twice into
/// a 32-bit half-cursor.
pub const PACKED_MAX_CAPACITY: usize = (1 << 31) - 1;

/// Cell content meaning "no index here".
const EMPTY: usize = usize::MAX;

const LOWER_HALF: u64 = 0x0000_0000_FFFF_FFFF;

#[inline]
fn pack(r: u64, w: u64) -> u64 {
    (r << 32) | w
}

#[inline]
fn unpack(word: u64) -> (u64, u64) {
    (word >> 32, word & LOWER_HALF)
}

/// Bounded MPMC index queue whose read and write cursors share one word.
///
/// The upper 32 bits hold `r`, the lower 32 bits hold `w`. The ring has
/// `capacity + 1` cells and one of them is always empty, so "empty" is
/// `r == w` and "full" is `w - r == capacity`, both decided from a single
/// load.
///
/// Cursors count modulo `span`, the largest multiple of the ring length that
/// fits in 32 bits, instead of modulo the ring length. Positions are still
/// `cursor % ring_len`, but a stalled thread's CAS on a stale word can only
/// succeed after the cursors have travelled roughly 2^32 steps.
///
/// A producer stakes the cell at `w` with a CAS from [`EMPTY`] before
/// advancing `w`, so two producers that read the same word cannot overwrite
/// each other's payload. A producer that finds `w` moved under it gives the
/// cell back and starts over.
///
/// Neither operation waits on another thread: a push that finds its cell
/// still staked by a stalled producer, or not yet cleared by a stalled
/// consumer, returns `false` while the word is unchanged. Callers that must
/// land the push retry through their own yield strategy.
pub struct PackedQueue {
    rw: CachePadded<AtomicU64>,
    ring: Box<[AtomicUsize]>,
    ring_len: u64,
    span: u64,
    capacity: usize,
    counters: QueueCounters,
}

impl PackedQueue {
    #[inline]
    fn cell(&self, cursor: u64) -> &AtomicUsize {
        &self.ring[(cursor % self.ring_len) as usize]
    }

    #[inline]
    fn advance(&self, cursor: u64) -> u64 {
        (cursor + 1) % self.span
    }

    #[inline]
    fn distance(&self, r: u64, w: u64) -> u64 {
        (w + self.span - r) % self.span
    }
}

impl IndexQueue for PackedQueue {
    fn with_capacity(capacity: usize) -> PoolResult<Self> {
        check_capacity(QueueKind::Packed, capacity, PACKED_MAX_CAPACITY)?;

        let ring_len = capacity as u64 + 1;
        let span = (1_u64 << 32) / ring_len * ring_len;

        Ok(Self {
            rw: CachePadded::new(AtomicU64::new(pack(0, 0))),
            ring: (0..ring_len).map(|_| AtomicUsize::new(EMPTY)).collect(),
            ring_len,
            span,
            capacity,
            counters: QueueCounters::new(),
        })
    }

    fn try_push(&self, index: usize) -> bool {
        if index == EMPTY {
            return false;
        }

        let backoff = Backoff::new();
        'claim: loop {
            let word = self.rw.load(Ordering::Acquire);
            let (r, w) = unpack(word);
            if self.distance(r, w) == self.capacity as u64 {
                return false;
            }

            let cell = self.cell(w);
            if cell
                .compare_exchange(EMPTY, index, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // Another producer holds this cell, or the consumer that
                // drained it has not cleared it yet. Neither is ours to wait
                // on: fail unless the word moved and a fresh attempt may land.
                self.counters.record_push_failure();
                if self.rw.load(Ordering::Acquire) == word {
                    return false;
                }
                sync::spin(&backoff);
                continue;
            }

            let mut current = word;
            loop {
                let (r, _) = unpack(current);
                match self.rw.compare_exchange_weak(
                    current,
                    pack(r, self.advance(w)),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return true,
                    Err(actual) => {
                        self.counters.record_push_failure();
                        let (_, actual_w) = unpack(actual);
                        if actual_w != w {
                            // Our word was stale and the cell was never ours
                            // to fill.
                            cell.store(EMPTY, Ordering::Release);
                            sync::spin(&backoff);
                            continue 'claim;
                        }
                        // Only `r` moved, which only makes room.
                        current = actual;
                    }
                }
            }
        }
    }

    fn try_pop(&self) -> Option<usize> {
        let backoff = Backoff::new();
        loop {
            let word = self.rw.load(Ordering::Acquire);
            let (r, w) = unpack(word);
            if r == w {
                return None;
            }

            let cell = self.cell(r);
            let value = cell.load(Ordering::Acquire);
            if value == EMPTY {
                // Already drained by a consumer our word has not seen yet.
                self.counters.record_pop_failure();
                if self.rw.load(Ordering::Acquire) == word {
                    return None;
                }
                sync::spin(&backoff);
                continue;
            }

            match self.rw.compare_exchange_weak(
                word,
                pack(self.advance(r), w),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    cell.store(EMPTY, Ordering::Release);
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
        let (r, w) = unpack(self.rw.load(Ordering::Acquire));
        self.distance(r, w) as usize
    }

    fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Packed
    }
}

impl core::fmt::Debug for PackedQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PackedQueue")
            .field("capacity", &self.capacity)
            .field("ring_len", &self.ring_len)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
