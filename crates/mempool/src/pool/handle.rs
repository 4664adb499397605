//! RAII handle to a checked-out slot

use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use super::Pool;
use crate::error::PoolResult;
use crate::queue::{IndexQueue, TicketQueue};
use crate::slots::SlotIndex;

/// Exclusive access to one pooled object.
///
/// Dereferences to the object. The slot goes back to its pool when the
/// handle is dropped; use [`Handle::release`] to observe the outcome
/// instead, or [`Handle::detach`] to keep the slot checked out and return
/// it later by index.
///
/// # Safety
///
/// - `index` was claimed by this handle in [`Pool::acquire`] and stays
///   claimed until the handle is released, dropped or detached,
/// - the borrow of `pool` keeps the slot storage alive,
/// - `PhantomData<&mut T>` gives the handle the auto traits of `&mut T`:
///   `Send` needs `T: Send`, `Sync` needs `T: Sync`.
pub struct Handle<'a, T, Q: IndexQueue = TicketQueue> {
    pool: &'a Pool<T, Q>,
    index: SlotIndex,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, Q: IndexQueue> Handle<'a, T, Q> {
    pub(super) fn new(pool: &'a Pool<T, Q>, index: SlotIndex) -> Self {
        Self {
            pool,
            index,
            _marker: PhantomData,
        }
    }

    /// Slot this handle refers to. Stable for the handle's lifetime.
    #[must_use]
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// Get reference to the pool
    #[must_use]
    pub fn pool(&self) -> &'a Pool<T, Q> {
        self.pool
    }

    /// Return the slot to its pool, reporting failures.
    pub fn release(self) -> PoolResult<()> {
        let pool = self.pool;
        pool.release_claimed(self.detach())
    }

    /// Give up the handle without releasing the slot.
    ///
    /// The slot stays checked out until
    /// [`Pool::release_index`] is called with the returned index.
    #[must_use = "a detached slot stays checked out until released by index"]
    pub fn detach(self) -> SlotIndex {
        let this = ManuallyDrop::new(self);
        this.index
    }
}

impl<T, Q: IndexQueue> Deref for Handle<'_, T, Q> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: this handle holds the slot's claim, see type docs.
        unsafe { &*self.pool.slot_ptr(self.index) }
    }
}

impl<T, Q: IndexQueue> DerefMut for Handle<'_, T, Q> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: this handle holds the slot's claim and `&mut self` rules
        // out other borrows through it.
        unsafe { &mut *self.pool.slot_ptr(self.index) }
    }
}

impl<T, Q: IndexQueue> Drop for Handle<'_, T, Q> {
    fn drop(&mut self) {
        if let Err(err) = self.pool.release_claimed(self.index) {
            // Already logged where the error was built. A broken pool must
            // not go unnoticed, unless we are unwinding anyway.
            if err.is_fatal() && !std::thread::panicking() {
                panic!("{err}");
            }
        }
    }
}

impl<T: fmt::Debug, Q: IndexQueue> fmt::Debug for Handle<'_, T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("pool", &self.pool.name())
            .field("index", &self.index)
            .field("value", &**self)
            .finish()
    }
}
