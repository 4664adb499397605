//! Channel-backed baseline queue

use crossbeam::channel::{self, Receiver, Sender};

use super::{IndexQueue, QueueKind, check_capacity};
use crate::error::PoolResult;
use crate::stats::QueueCounters;

/// Free list backed by a bounded crossbeam channel.
///
/// `try_push` is a non-blocking send and `try_pop` a non-blocking receive.
/// Strict FIFO. Contention is absorbed inside the channel, so the queue
/// counters stay at zero. This is the yardstick the lock-free queues are
/// measured against.
#[derive(Debug)]
pub struct ChannelQueue {
    tx: Sender<usize>,
    rx: Receiver<usize>,
    capacity: usize,
    counters: QueueCounters,
}

impl IndexQueue for ChannelQueue {
    fn with_capacity(capacity: usize) -> PoolResult<Self> {
        check_capacity(QueueKind::Channel, capacity, usize::MAX)?;

        let (tx, rx) = channel::bounded(capacity);
        Ok(Self {
            tx,
            rx,
            capacity,
            counters: QueueCounters::new(),
        })
    }

    fn try_push(&self, index: usize) -> bool {
        // Both ends live in `self`, so only `Full` can come back.
        self.tx.try_send(index).is_ok()
    }

    fn try_pop(&self) -> Option<usize> {
        self.rx.try_recv().ok()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.rx.len()
    }

    fn counters(&self) -> &QueueCounters {
        &self.counters
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Channel
    }
}
