//! Diagnostic counters
//!
//! - [`QueueCounters`]: lost CAS races per free-index queue
//! - [`PoolStats`]: acquire / release accounting per pool
//!
//! Everything here is read-only from the outside and uses relaxed atomics;
//! none of it participates in the pool's synchronization.

mod pool;
mod queue;

pub use pool::{PoolStats, PoolStatsSnapshot};
pub use queue::{QueueCounters, QueueCountersSnapshot};
