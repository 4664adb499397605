//! Interior mutability for pooled slots.
//!
//! `SyncUnsafeCell` is an `UnsafeCell` that can be shared between threads.
//! Exclusive access to a slot is established by the slot cache's tag CAS,
//! not by the cell itself.

use core::cell::UnsafeCell;

/// A wrapper around `UnsafeCell<T>` that implements `Sync`.
///
/// # Safety
///
/// A slot may only be dereferenced by the caller that won the claim on its
/// tag. The pool hands out at most one [`Handle`](crate::Handle) per claim,
/// so at most one `&mut T` exists per slot at any time.
///
/// # Memory Layout
///
/// `repr(transparent)`: the stride of `[SyncUnsafeCell<T>]` equals the
/// stride of `[T]`, which is what address-based slot lookup relies on.
#[repr(transparent)]
pub(crate) struct SyncUnsafeCell<T: ?Sized>(UnsafeCell<T>);

// SAFETY: shared access only hands out raw pointers; every dereference is
// gated by a successful tag claim, so `T` only ever moves between threads
// (requires `T: Send`), never gets aliased.
unsafe impl<T: ?Sized + Send> Sync for SyncUnsafeCell<T> {}

impl<T> SyncUnsafeCell<T> {
    #[inline]
    pub(crate) const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

impl<T: ?Sized> SyncUnsafeCell<T> {
    /// Raw pointer to the slot contents.
    ///
    /// # Safety
    ///
    /// Dereferencing requires holding the slot's claim.
    #[inline]
    pub(crate) fn get(&self) -> *mut T {
        self.0.get()
    }

    /// Exclusive access through an exclusive borrow of the cell.
    #[inline]
    pub(crate) fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}
