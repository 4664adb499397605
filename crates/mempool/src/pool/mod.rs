//! Fixed-capacity concurrent object pool
//!
//! # Safety
//!
//! A [`Pool`] pairs a [`SlotCache`] with a free-index queue. Every slot index
//! is in exactly one of two places at any quiescent point:
//!
//! - in the free queue, with its tag clear, or
//! - held by the caller that acquired it, with its tag set.
//!
//! `acquire` pops an index and then claims its tag; `release` clears the tag
//! and then pushes the index. Because the tag is cleared before the index is
//! visible in the queue, and set only after it left the queue, a slot can be
//! claimed by at most one holder. A popped index whose claim fails means the
//! queue returned something it should not have, which is reported as
//! [`PoolError::BrokenInvariant`].
//!
//! Happens-before for slot contents: a holder's writes precede its tag clear
//! (release) and queue push (release); the next holder's queue pop and tag
//! claim (acquire) precede its reads.

mod handle;

use core::fmt;

pub use handle::Handle;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

use crate::backoff;
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::queue::{IndexQueue, TicketQueue};
use crate::slots::{SlotCache, SlotIndex};
use crate::stats::{PoolStats, QueueCountersSnapshot};

/// Thread-safe pool of `capacity` pre-constructed `T` values.
///
/// Objects are created once, when the pool is built, and reused for the
/// pool's whole lifetime. Acquiring and releasing never allocates. The free
/// indices live in a lock-free [`IndexQueue`], [`TicketQueue`] by default.
///
/// # Example
/// ```
/// use nebula_mempool::Pool;
///
/// let pool: Pool<Vec<u8>> = Pool::new(2).unwrap();
///
/// let mut buf = pool.acquire().unwrap().expect("pool has free slots");
/// buf.extend_from_slice(b"frame");
/// assert_eq!(pool.available(), 1);
///
/// // Returned on drop
/// drop(buf);
/// assert_eq!(pool.available(), 2);
/// ```
pub struct Pool<T, Q: IndexQueue = TicketQueue> {
    cache: SlotCache<T>,
    queue: Q,
    config: PoolConfig,
    stats: PoolStats,
}

impl<T: Default> Pool<T, TicketQueue> {
    /// Create a pool of `capacity` default values on the default queue.
    pub fn new(capacity: usize) -> PoolResult<Self> {
        Self::with_queue(capacity)
    }
}

impl<T, Q: IndexQueue> Pool<T, Q> {
    /// Create a pool of `capacity` default values on queue algorithm `Q`.
    pub fn with_queue(capacity: usize) -> PoolResult<Self>
    where
        T: Default,
    {
        Self::with_config(PoolConfig::bounded(capacity), |_| T::default())
    }

    /// Create pool with custom configuration. Slot `i` starts out as
    /// `init(i)`.
    pub fn with_config<F>(config: PoolConfig, init: F) -> PoolResult<Self>
    where
        F: FnMut(SlotIndex) -> T,
    {
        config.validate()?;
        let queue = Q::with_capacity(config.capacity)?;
        Self::with_parts(config, queue, init)
    }

    /// Create a pool on an already built, empty free queue. Useful with
    /// [`AnyQueue`](crate::AnyQueue), whose algorithm is picked at runtime.
    pub fn with_parts<F>(config: PoolConfig, queue: Q, init: F) -> PoolResult<Self>
    where
        F: FnMut(SlotIndex) -> T,
    {
        config.validate()?;
        if queue.capacity() < config.capacity || !queue.is_empty() {
            return Err(PoolError::invalid_config(&format!(
                "free queue must be empty and hold at least {} indices",
                config.capacity
            )));
        }

        let cache = SlotCache::new(config.capacity, init)?;
        for index in 0..config.capacity {
            if !queue.try_push(index) {
                return Err(PoolError::initialization_failed(&format!(
                    "{} free queue of pool '{}'",
                    queue.kind(),
                    config.name
                )));
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            pool = %config.name,
            capacity = config.capacity,
            queue = %queue.kind(),
            "object pool created"
        );

        Ok(Self {
            cache,
            queue,
            config,
            stats: PoolStats::default(),
        })
    }

    /// Take a free object out of the pool.
    ///
    /// Returns `Ok(None)` when every slot is in use. Never blocks.
    ///
    /// # Errors
    ///
    /// [`PoolError::BrokenInvariant`] if the free queue handed out an index
    /// that is out of range or already claimed.
    pub fn acquire(&self) -> PoolResult<Option<Handle<'_, T, Q>>> {
        let Some(raw) = self.queue.try_pop() else {
            if self.config.track_stats {
                self.stats.record_exhausted();
            }
            #[cfg(feature = "logging")]
            trace!(pool = %self.config.name, "object pool empty");
            return Ok(None);
        };

        let index = SlotIndex::new(raw);
        if !self.cache.try_claim(index) {
            self.stats.record_broken_invariant();
            let details = if self.cache.contains(index) {
                format!("free queue yielded slot {index}, which is already claimed")
            } else {
                format!(
                    "free queue yielded slot {index}, outside capacity {}",
                    self.capacity()
                )
            };
            return Err(PoolError::broken_invariant(&self.config.name, &details));
        }

        if self.config.track_stats {
            self.stats.record_hit();
        }
        Ok(Some(Handle::new(self, index)))
    }

    /// Like [`acquire`](Self::acquire), for callers that treat a broken
    /// invariant as unrecoverable.
    ///
    /// # Panics
    ///
    /// Panics on [`PoolError::BrokenInvariant`].
    pub fn try_acquire(&self) -> Option<Handle<'_, T, Q>> {
        match self.acquire() {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Like [`acquire`](Self::acquire), but an empty pool is an error.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every slot is in use, and whatever
    /// [`acquire`](Self::acquire) returns.
    pub fn acquire_or_err(&self) -> PoolResult<Handle<'_, T, Q>> {
        self.acquire()?
            .ok_or_else(|| PoolError::exhausted(&self.config.name, self.capacity()))
    }

    /// Return an object to the pool explicitly, observing the outcome.
    ///
    /// Dropping the handle does the same thing.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ForeignHandle`] if `handle` belongs to another pool.
    ///   The handle is then dropped and goes back to its own pool.
    /// - [`PoolError::DoubleRelease`] if the slot was already released
    ///   through [`release_index`](Self::release_index).
    /// - [`PoolError::BrokenInvariant`] if the free queue would not take the
    ///   index back.
    pub fn release(&self, handle: Handle<'_, T, Q>) -> PoolResult<()> {
        if !core::ptr::eq(handle.pool(), self) {
            return Err(PoolError::foreign_handle(&self.config.name));
        }
        self.release_claimed(handle.detach())
    }

    /// Return a slot by index, for handles given up with
    /// [`Handle::detach`].
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidIndex`] if `index` is outside the pool.
    /// - [`PoolError::DoubleRelease`] if the slot is not checked out. The
    ///   pool is left unchanged.
    /// - [`PoolError::BrokenInvariant`] as for [`release`](Self::release).
    ///
    /// # Safety
    ///
    /// No live [`Handle`] may refer to `index`. Releasing a slot that a
    /// handle still points at lets another thread acquire it while the
    /// handle can still read and write it.
    pub unsafe fn release_index(&self, index: SlotIndex) -> PoolResult<()> {
        if !self.cache.contains(index) {
            return Err(PoolError::invalid_index(index.get(), self.capacity()));
        }
        self.release_claimed(index)
    }

    /// Clear the claim on `index` and push it back to the free queue.
    pub(crate) fn release_claimed(&self, index: SlotIndex) -> PoolResult<()> {
        if !self.cache.try_release(index) {
            self.stats.record_double_release();
            return Err(PoolError::double_release(&self.config.name, index.get()));
        }

        // Before the push: `current_in_use` must never exceed capacity.
        if self.config.track_stats {
            self.stats.record_release();
        }

        let pushed = backoff::retry_with(
            &*self.config.yield_strategy,
            self.config.max_release_retries,
            || self.queue.try_push(index.get()),
        );

        match pushed {
            Ok(retries) => {
                #[cfg(feature = "logging")]
                {
                    if retries > 0 {
                        trace!(pool = %self.config.name, %index, retries, "release push retried");
                    }
                }
                #[cfg(not(feature = "logging"))]
                let _ = retries;
                Ok(())
            }
            Err(attempts) => {
                self.stats.record_broken_invariant();
                Err(PoolError::broken_invariant(
                    &self.config.name,
                    &format!("free queue rejected slot {index} after {attempts} push attempts"),
                ))
            }
        }
    }

    /// Slot index of a value living in this pool, recovered from its
    /// address.
    pub fn index_of(&self, value: &T) -> Option<SlotIndex> {
        self.cache.index_of_ptr(value)
    }

    /// Pointer to slot `index`. Only dereferenced by the slot's holder.
    pub(crate) fn slot_ptr(&self, index: SlotIndex) -> *mut T {
        self.cache.slot_ptr(index)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    /// Free slots. Approximate while other threads are active.
    #[must_use]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Checked-out slots, counted from the slot tags. Approximate while
    /// other threads are active.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.cache.claimed_count()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get pool statistics. Hit and release counters stay at zero when
    /// [`PoolConfig::track_stats`] is off; error counters are always kept.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// CAS retry counters of the free queue
    pub fn queue_counters(&self) -> QueueCountersSnapshot {
        self.queue.counters().snapshot()
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Exclusive access to every slot, e.g. to reset them between phases.
    /// No handle can be live while the pool is mutably borrowed.
    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.cache.iter_mut()
    }
}

impl<T, Q: IndexQueue> fmt::Debug for Pool<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.config.name)
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .field("queue", &self.queue.kind())
            .finish_non_exhaustive()
    }
}
