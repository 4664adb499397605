//! Atomic primitives used by the queues and the slot cache.
//!
//! Under `--cfg loom` every atomic and every spin point is routed through
//! `loom` so the model checker can explore interleavings of the CAS loops.
//! Diagnostic counters in [`crate::stats`] deliberately stay on
//! `core::sync::atomic`: they never guard payload visibility.

use crossbeam::utils::Backoff;

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};

/// Spin point inside a CAS retry loop.
#[inline]
pub(crate) fn spin(backoff: &Backoff) {
    #[cfg(loom)]
    {
        let _ = backoff;
        loom::thread::yield_now();
    }

    #[cfg(not(loom))]
    backoff.spin();
}

/// Spin point for loops that wait on another thread to finish a step.
#[inline]
pub(crate) fn snooze(backoff: &Backoff) {
    #[cfg(loom)]
    {
        let _ = backoff;
        loom::thread::yield_now();
    }

    #[cfg(not(loom))]
    backoff.snooze();
}

/// Hands the time slice back to the scheduler.
#[inline]
pub(crate) fn yield_now() {
    #[cfg(loom)]
    loom::thread::yield_now();

    #[cfg(not(loom))]
    std::thread::yield_now();
}
