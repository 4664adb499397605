//! Bounded free-index queues
//!
//! A free-index queue holds the slot indices a pool can hand out next. All
//! implementations share the [`IndexQueue`] contract and can be swapped
//! under a [`Pool`](crate::Pool) or benchmarked against one another:
//!
//! - [`TicketQueue`]: two CAS-advanced cursors plus a per-cell publish stamp.
//!   The default.
//! - [`PackedQueue`]: both cursors packed into one `AtomicU64`.
//! - [`IncrementQueue`]: fetch-and-add cursors with confirmation counters.
//!   Experimental, see its docs.
//! - [`ChannelQueue`]: a bounded crossbeam channel, the baseline.
//!
//! None of the operations block. A push on a full queue and a pop on an
//! empty queue fail immediately; lost CAS races are retried internally and
//! only show up in [`QueueCounters`].

mod channel;
mod increment;
mod packed;
mod ticket;

use core::fmt;

pub use channel::ChannelQueue;
pub use increment::IncrementQueue;
pub use packed::PackedQueue;
pub use ticket::TicketQueue;

use crate::error::{PoolError, PoolResult};
use crate::stats::QueueCounters;

/// Bounded multi-producer / multi-consumer queue of slot indices.
///
/// Guarantees, for every implementation:
///
/// - `try_pop` only returns indices that were previously pushed, and never
///   returns the same push twice;
/// - `try_push` fails instead of overwriting when `capacity` indices are
///   queued;
/// - neither operation blocks.
///
/// Ordering between unrelated indices is not guaranteed under contention.
pub trait IndexQueue: Send + Sync {
    /// Allocate an empty queue able to hold `capacity` indices.
    fn with_capacity(capacity: usize) -> PoolResult<Self>
    where
        Self: Sized;

    /// Enqueue `index`. Returns `false` when the queue is full, or when the
    /// push would have to wait for another thread to finish its operation.
    fn try_push(&self, index: usize) -> bool;

    /// Dequeue an index. Returns `None` when nothing is available.
    fn try_pop(&self) -> Option<usize>;

    fn capacity(&self) -> usize;

    /// Number of queued indices. Exact when no operation is in flight,
    /// approximate otherwise.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn counters(&self) -> &QueueCounters;

    fn kind(&self) -> QueueKind;
}

/// Identifies a queue algorithm in logs, errors and benchmark ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Ticket,
    Packed,
    Increment,
    Channel,
}

impl QueueKind {
    pub const ALL: [Self; 4] = [Self::Ticket, Self::Packed, Self::Increment, Self::Channel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Packed => "packed",
            Self::Increment => "increment",
            Self::Channel => "channel",
        }
    }

    /// Whether the algorithm is safe under concurrent producers and
    /// consumers. Only [`QueueKind::Increment`] is not.
    pub fn is_linearizable(&self) -> bool {
        !matches!(self, Self::Increment)
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queue whose algorithm is picked at runtime.
///
/// Handy for harnesses that sweep over [`QueueKind::ALL`]; pools that know
/// their algorithm at compile time should name it directly.
#[derive(Debug)]
pub enum AnyQueue {
    Ticket(TicketQueue),
    Packed(PackedQueue),
    Increment(IncrementQueue),
    Channel(ChannelQueue),
}

impl AnyQueue {
    pub fn new(kind: QueueKind, capacity: usize) -> PoolResult<Self> {
        Ok(match kind {
            QueueKind::Ticket => Self::Ticket(TicketQueue::with_capacity(capacity)?),
            QueueKind::Packed => Self::Packed(PackedQueue::with_capacity(capacity)?),
            QueueKind::Increment => Self::Increment(IncrementQueue::with_capacity(capacity)?),
            QueueKind::Channel => Self::Channel(ChannelQueue::with_capacity(capacity)?),
        })
    }

    fn inner(&self) -> &dyn IndexQueue {
        match self {
            Self::Ticket(queue) => queue,
            Self::Packed(queue) => queue,
            Self::Increment(queue) => queue,
            Self::Channel(queue) => queue,
        }
    }
}

impl IndexQueue for AnyQueue {
    fn with_capacity(capacity: usize) -> PoolResult<Self> {
        Self::new(QueueKind::Ticket, capacity)
    }

    fn try_push(&self, index: usize) -> bool {
        self.inner().try_push(index)
    }

    fn try_pop(&self) -> Option<usize> {
        self.inner().try_pop()
    }

    fn capacity(&self) -> usize {
        self.inner().capacity()
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn counters(&self) -> &QueueCounters {
        self.inner().counters()
    }

    fn kind(&self) -> QueueKind {
        self.inner().kind()
    }
}

pub(crate) fn check_capacity(kind: QueueKind, capacity: usize, max: usize) -> PoolResult<()> {
    if capacity == 0 {
        return Err(PoolError::invalid_config(&format!(
            "{kind} queue capacity must be non-zero"
        )));
    }
    if capacity > max {
        return Err(PoolError::invalid_config(&format!(
            "{kind} queue capacity {capacity} exceeds maximum {max}"
        )));
    }
    Ok(())
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected_everywhere() {
        for kind in QueueKind::ALL {
            let err = AnyQueue::new(kind, 0).unwrap_err();
            assert_eq!(err.code(), "MEMPOOL:CONFIG:INVALID", "{kind}");
        }
    }

    #[test]
    fn test_any_queue_dispatches_to_kind() {
        for kind in QueueKind::ALL {
            let queue = AnyQueue::new(kind, 2).unwrap();
            assert_eq!(queue.kind(), kind);
            assert_eq!(queue.capacity(), 2);
            assert!(queue.is_empty());

            assert!(queue.try_push(1));
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.try_pop(), Some(1));
            assert_eq!(queue.try_pop(), None);
        }
    }

    #[test]
    fn test_capacity_four_scenario() {
        for kind in QueueKind::ALL {
            let queue = AnyQueue::new(kind, 4).unwrap();
            for index in 0..4 {
                assert!(queue.try_push(index), "{kind}: push {index}");
            }
            assert!(!queue.try_push(4), "{kind}: push into full queue");

            let mut popped: Vec<_> = (0..4).map(|_| queue.try_pop().unwrap()).collect();
            popped.sort_unstable();
            assert_eq!(popped, vec![0, 1, 2, 3], "{kind}");
            assert_eq!(queue.try_pop(), None, "{kind}: pop from empty queue");
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(QueueKind::Ticket.to_string(), "ticket");
        assert_eq!(QueueKind::Channel.as_str(), "channel");
        assert!(!QueueKind::Increment.is_linearizable());
        assert!(QueueKind::Packed.is_linearizable());
    }
}
