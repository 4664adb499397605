//! # nebula-mempool
//!
//! Fixed-capacity, lock-free object pools for the Nebula workflow automation
//! ecosystem.
//!
//! A [`Pool`] pre-constructs `capacity` objects once and then hands them out
//! and takes them back without allocating. Free slots are tracked by slot
//! index in a bounded lock-free queue; every slot carries an atomic tag that
//! turns a double handout or a double release into a reported error instead
//! of silent aliasing.
//!
//! - [`pool`]: [`Pool`] and its RAII [`Handle`]
//! - [`slots`]: the backing slot array with per-slot claim tags
//! - [`queue`]: interchangeable free-index queue algorithms
//! - [`stats`]: diagnostic counters for pools and queues
//! - [`harness`]: concurrent stress runs with failure-rate reports
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_mempool::prelude::*;
//!
//! # fn main() -> PoolResult<()> {
//! let pool = Pool::<[u64; 32]>::new(64)?;
//!
//! let mut frame = pool.acquire_or_err()?;
//! frame[0] = 0xAB;
//! assert!(frame.index().get() < 64);
//!
//! // Returned to the pool when dropped
//! drop(frame);
//! assert_eq!(pool.available(), 64);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `logging` (default): structured `tracing` events on pool creation,
//!   exhaustion, double release and broken invariants
//!
//! ## Model checking
//!
//! Built with `RUSTFLAGS="--cfg loom"`, the queue and slot-cache atomics are
//! routed through `loom` (see `tests/loom.rs`).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
// Slot storage and handles are raw-pointer based; see the `# Safety`
// sections in `slots` and `pool`.
#![allow(unsafe_code)]

pub mod backoff;
mod cell;
pub mod config;
pub mod error;
#[cfg(not(loom))]
pub mod harness;
pub mod pool;
pub mod queue;
pub mod slots;
pub mod stats;
mod sync;

pub use crate::config::PoolConfig;
pub use crate::error::{PoolError, PoolResult};
pub use crate::pool::{Handle, Pool};
pub use crate::queue::{
    AnyQueue, ChannelQueue, IncrementQueue, IndexQueue, PackedQueue, QueueKind, TicketQueue,
};
pub use crate::slots::{SlotCache, SlotIndex};
pub use crate::stats::{PoolStats, PoolStatsSnapshot, QueueCounters, QueueCountersSnapshot};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::backoff::{SpinThenYield, ThreadYield, YieldStrategy};
    pub use crate::config::PoolConfig;
    pub use crate::error::{PoolError, PoolResult};
    pub use crate::pool::{Handle, Pool};
    pub use crate::queue::{AnyQueue, IndexQueue, QueueKind, TicketQueue};
    pub use crate::slots::SlotIndex;
}
