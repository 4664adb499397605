//! Slot cache: the pool's fixed backing array plus one liveness tag per slot
//!
//! # Safety
//!
//! The slot array is a `Box<[_]>` allocated once in [`SlotCache::new`] and
//! never resized, so a slot's address is stable for the cache's lifetime.
//! Slot contents are only reachable through [`SlotCache::slot_ptr`], and the
//! pool only dereferences that pointer while it holds the slot's claim:
//!
//! - `try_claim` flips the tag `false -> true` with a CAS; exactly one caller
//!   wins it,
//! - `try_release` flips it back; a second release of the same claim fails.

use core::fmt;

use crate::cell::SyncUnsafeCell;
use crate::error::{PoolError, PoolResult};
use crate::sync::{AtomicBool, Ordering};

/// Position of a slot in its cache, in `[0, capacity)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(usize);

impl SlotIndex {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl From<SlotIndex> for usize {
    fn from(index: SlotIndex) -> Self {
        index.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Fixed array of `T` with a claim tag per slot.
pub struct SlotCache<T> {
    slots: Box<[SyncUnsafeCell<T>]>,
    /// `true` while the slot is checked out.
    tags: Box<[AtomicBool]>,
}

impl<T> SlotCache<T> {
    /// Allocate `capacity` slots, initialising slot `i` with `init(i)`.
    pub fn new<F>(capacity: usize, mut init: F) -> PoolResult<Self>
    where
        F: FnMut(SlotIndex) -> T,
    {
        if capacity == 0 {
            return Err(PoolError::invalid_config("slot cache capacity must be non-zero"));
        }

        Ok(Self {
            slots: (0..capacity)
                .map(|index| SyncUnsafeCell::new(init(SlotIndex(index))))
                .collect(),
            tags: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
        })
    }

    pub fn with_default(capacity: usize) -> PoolResult<Self>
    where
        T: Default,
    {
        Self::new(capacity, |_| T::default())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn contains(&self, index: SlotIndex) -> bool {
        index.0 < self.slots.len()
    }

    /// Claim a free slot. Fails if it is already claimed or out of range.
    #[inline]
    pub fn try_claim(&self, index: SlotIndex) -> bool {
        self.tags.get(index.0).is_some_and(|tag| {
            tag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        })
    }

    /// Release a claimed slot. Fails if it is already free or out of range.
    #[inline]
    pub fn try_release(&self, index: SlotIndex) -> bool {
        self.tags.get(index.0).is_some_and(|tag| {
            tag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        })
    }

    pub fn is_claimed(&self, index: SlotIndex) -> bool {
        self.tags
            .get(index.0)
            .is_some_and(|tag| tag.load(Ordering::Acquire))
    }

    /// Number of claimed slots. Scans every tag; exact when quiescent.
    pub fn claimed_count(&self) -> usize {
        self.tags
            .iter()
            .filter(|tag| tag.load(Ordering::Acquire))
            .count()
    }

    /// Recover the slot index of a value stored in this cache from its
    /// address.
    ///
    /// Returns `None` for references that do not point at the start of a
    /// slot of this cache, and for zero-sized `T` where every slot shares
    /// one address.
    pub fn index_of_ptr(&self, value: &T) -> Option<SlotIndex> {
        let stride = core::mem::size_of::<SyncUnsafeCell<T>>();
        if stride == 0 {
            return None;
        }

        let base = self.slots.as_ptr() as usize;
        let offset = (value as *const T as usize).checked_sub(base)?;
        if offset % stride != 0 {
            return None;
        }

        let index = SlotIndex(offset / stride);
        self.contains(index).then_some(index)
    }

    /// Pointer to slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    ///
    /// Dereferencing the pointer is only sound while holding the slot's claim.
    #[inline]
    pub(crate) fn slot_ptr(&self, index: SlotIndex) -> *mut T {
        self.slots[index.0].get()
    }

    /// Exclusive access to a slot through an exclusive borrow of the cache.
    pub fn get_mut(&mut self, index: SlotIndex) -> Option<&mut T> {
        self.slots.get_mut(index.0).map(SyncUnsafeCell::get_mut)
    }

    /// Exclusive access to every slot, in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut().map(SyncUnsafeCell::get_mut)
    }
}

impl<T> fmt::Debug for SlotCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotCache")
            .field("capacity", &self.capacity())
            .field("claimed", &self.claimed_count())
            .finish_non_exhaustive()
    }
}
