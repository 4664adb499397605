//! Statistics tracking for object pools

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Statistics for pool operations
#[derive(Debug)]
pub struct PoolStats {
    // Basic counters
    pub(crate) acquires: AtomicU64,
    pub(crate) hits: AtomicU64,
    pub(crate) exhausted: AtomicU64,
    pub(crate) releases: AtomicU64,
    pub(crate) double_releases: AtomicU64,
    pub(crate) broken_invariants: AtomicU64,

    // Occupancy
    pub(crate) current_in_use: AtomicUsize,
    pub(crate) peak_in_use: AtomicUsize,

    // Timing
    pub(crate) created_at: Instant,
}

impl Default for PoolStats {
    fn default() -> Self {
        Self {
            acquires: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            double_releases: AtomicU64::new(0),
            broken_invariants: AtomicU64::new(0),
            current_in_use: AtomicUsize::new(0),
            peak_in_use: AtomicUsize::new(0),
            created_at: Instant::now(),
        }
    }
}

impl PoolStats {
    /// Record an acquire that handed out a slot
    pub(crate) fn record_hit(&self) {
        self.acquires.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);

        let in_use = self.current_in_use.fetch_add(1, Ordering::Relaxed) + 1;
        self.update_peak(in_use);
    }

    /// Record an acquire that found the free queue empty
    pub(crate) fn record_exhausted(&self) {
        self.acquires.fetch_add(1, Ordering::Relaxed);
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a slot returned to the free queue
    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.current_in_use.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_double_release(&self) {
        self.double_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broken_invariant(&self) {
        self.broken_invariants.fetch_add(1, Ordering::Relaxed);
    }

    fn update_peak(&self, in_use: usize) {
        let mut peak = self.peak_in_use.load(Ordering::Relaxed);
        while in_use > peak {
            match self.peak_in_use.compare_exchange_weak(
                peak,
                in_use,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    /// Fraction of acquires that returned a slot (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = self.acquires.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn total_acquires(&self) -> u64 {
        self.acquires.load(Ordering::Relaxed)
    }

    pub fn total_exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }

    pub fn total_releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn total_double_releases(&self) -> u64 {
        self.double_releases.load(Ordering::Relaxed)
    }

    pub fn total_broken_invariants(&self) -> u64 {
        self.broken_invariants.load(Ordering::Relaxed)
    }

    /// Slots checked out right now, as seen by the counters
    pub fn current_in_use(&self) -> usize {
        self.current_in_use.load(Ordering::Relaxed)
    }

    pub fn peak_in_use(&self) -> usize {
        self.peak_in_use.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot::from(self)
    }

    /// Reset operation counters
    pub fn reset(&self) {
        self.acquires.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.exhausted.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.double_releases.store(0, Ordering::Relaxed);
        self.broken_invariants.store(0, Ordering::Relaxed);

        // Occupancy reflects live handles; leave it alone
    }
}

/// Pool statistics snapshot
#[derive(Debug, Clone)]
pub struct PoolStatsSnapshot {
    pub total_acquires: u64,
    pub total_exhausted: u64,
    pub total_releases: u64,
    pub total_double_releases: u64,
    pub total_broken_invariants: u64,
    pub hit_rate: f64,
    pub current_in_use: usize,
    pub peak_in_use: usize,
    pub uptime: Duration,
}

impl From<&PoolStats> for PoolStatsSnapshot {
    fn from(stats: &PoolStats) -> Self {
        Self {
            total_acquires: stats.total_acquires(),
            total_exhausted: stats.total_exhausted(),
            total_releases: stats.total_releases(),
            total_double_releases: stats.total_double_releases(),
            total_broken_invariants: stats.total_broken_invariants(),
            hit_rate: stats.hit_rate(),
            current_in_use: stats.current_in_use(),
            peak_in_use: stats.peak_in_use(),
            uptime: stats.uptime(),
        }
    }
}

impl core::fmt::Display for PoolStatsSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Pool Statistics:")?;
        writeln!(
            f,
            "  Acquires: {} (hit rate: {:.2}%, exhausted: {})",
            self.total_acquires,
            self.hit_rate * 100.0,
            self.total_exhausted
        )?;
        writeln!(f, "  Releases: {}", self.total_releases)?;
        writeln!(f, "  Double releases: {}", self.total_double_releases)?;
        writeln!(f, "  Broken invariants: {}", self.total_broken_invariants)?;
        writeln!(
            f,
            "  In use: {} (peak: {})",
            self.current_in_use, self.peak_in_use
        )?;
        writeln!(f, "  Uptime: {:?}", self.uptime)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_tracking() {
        let stats = PoolStats::default();

        stats.record_hit();
        stats.record_exhausted();

        assert_eq!(stats.total_acquires(), 2);
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.current_in_use(), 1);
        assert_eq!(stats.peak_in_use(), 1);
    }

    #[test]
    fn test_peak_tracking() {
        let stats = PoolStats::default();

        for _ in 0..5 {
            stats.record_hit();
        }
        assert_eq!(stats.peak_in_use(), 5);

        for _ in 0..3 {
            stats.record_release();
        }
        assert_eq!(stats.current_in_use(), 2);
        assert_eq!(stats.peak_in_use(), 5); // Peak unchanged
    }

    #[test]
    fn test_reset_keeps_occupancy() {
        let stats = PoolStats::default();
        stats.record_hit();
        stats.record_double_release();
        stats.reset();

        assert_eq!(stats.total_acquires(), 0);
        assert_eq!(stats.total_double_releases(), 0);
        assert_eq!(stats.current_in_use(), 1);
    }

    #[test]
    fn test_snapshot_display() {
        let stats = PoolStats::default();
        stats.record_hit();
        stats.record_release();

        let rendered = stats.snapshot().to_string();
        assert!(rendered.contains("Acquires: 1"));
        assert!(rendered.contains("Releases: 1"));
    }
}
