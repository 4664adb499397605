//! Cooperative yield points for retry loops
//!
//! The pool retries a release push that lost a race until it lands. Where it
//! waits between attempts is a [`YieldStrategy`], so a test harness can
//! inject delays (or counting hooks) into exactly that point to probe
//! interleavings.

use core::fmt;

use crossbeam::utils::Backoff;

use crate::sync;

/// Decides how a retry loop waits between attempts.
pub trait YieldStrategy: Send + Sync + fmt::Debug {
    /// Called after failed attempt number `attempt` (starting at 0).
    ///
    /// `backoff` is fresh per retry loop, so implementations can escalate
    /// from spinning to yielding without keeping state of their own.
    fn pause(&self, attempt: usize, backoff: &Backoff);
}

/// Exponential spin that escalates to `thread::yield_now` (crossbeam's
/// `Backoff::snooze`). The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinThenYield;

impl YieldStrategy for SpinThenYield {
    #[inline]
    fn pause(&self, _attempt: usize, backoff: &Backoff) {
        sync::snooze(backoff);
    }
}

/// Always yields the time slice, never spins.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadYield;

impl YieldStrategy for ThreadYield {
    #[inline]
    fn pause(&self, _attempt: usize, _backoff: &Backoff) {
        sync::yield_now();
    }
}

/// Runs a caller-supplied hook at the yield point.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use nebula_mempool::backoff::FnYield;
///
/// let pauses = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&pauses);
/// let strategy = FnYield::new(move |_attempt| {
///     seen.fetch_add(1, Ordering::Relaxed);
///     std::thread::yield_now();
/// });
/// # let _ = strategy;
/// ```
pub struct FnYield<F> {
    hook: F,
}

impl<F> FnYield<F>
where
    F: Fn(usize) + Send + Sync,
{
    pub fn new(hook: F) -> Self {
        Self { hook }
    }
}

impl<F> fmt::Debug for FnYield<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnYield").finish_non_exhaustive()
    }
}

impl<F> YieldStrategy for FnYield<F>
where
    F: Fn(usize) + Send + Sync,
{
    #[inline]
    fn pause(&self, attempt: usize, _backoff: &Backoff) {
        (self.hook)(attempt);
    }
}

/// Retry `op` until it returns `true` or `max_attempts` attempts have run.
///
/// Returns the number of failed attempts before success, or `Err` with the
/// attempt count once the bound is hit.
pub(crate) fn retry_with<F>(
    strategy: &dyn YieldStrategy,
    max_attempts: usize,
    mut op: F,
) -> Result<usize, usize>
where
    F: FnMut() -> bool,
{
    let backoff = Backoff::new();
    for attempt in 0..max_attempts {
        if op() {
            return Ok(attempt);
        }
        strategy.pause(attempt, &backoff);
    }
    Err(max_attempts)
}

#[cfg(all(test, not(loom)))]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_retry_succeeds_after_transient_failures() {
        let mut remaining = 3;
        let failed = retry_with(&SpinThenYield, 10, || {
            if remaining == 0 {
                true
            } else {
                remaining -= 1;
                false
            }
        });
        assert_eq!(failed, Ok(3));
    }

    #[test]
    fn test_retry_gives_up_at_bound() {
        assert_eq!(retry_with(&ThreadYield, 5, || false), Err(5));
    }

    #[test]
    fn test_hook_sees_every_attempt() {
        let seen = Arc::new(AtomicUsize::new(0));
        let hook_seen = Arc::clone(&seen);
        let strategy = FnYield::new(move |attempt| {
            assert_eq!(hook_seen.fetch_add(1, Ordering::Relaxed), attempt);
        });

        assert_eq!(retry_with(&strategy, 4, || false), Err(4));
        assert_eq!(seen.load(Ordering::Relaxed), 4);
    }
}
