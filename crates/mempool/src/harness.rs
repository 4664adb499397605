//! Concurrent stress harness for queues and pools
//!
//! Every worker owns a `batch`-sized array of cells and walks it
//! round-robin: a cell holding something gives it back (push / release), an
//! empty cell takes something (pop / acquire). Attempts and failures are
//! tallied per worker and summed into a [`StressReport`].
//!
//! Both runs end with a quiescent conservation check, so a report is only
//! returned when no index was lost or duplicated along the way.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::pool::{Handle, Pool};
use crate::queue::IndexQueue;
use crate::stats::QueueCountersSnapshot;

const COMPONENT: &str = "stress harness";

/// Stress run parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressConfig {
    /// Worker threads
    pub parallelism: usize,
    /// Cells per worker
    pub batch: usize,
    /// Capacity of the queue, or of each pool shard
    pub capacity: usize,
    /// Steps per worker
    pub iterations: usize,
    /// Independent pools for [`run_pool_stress`]. Ignored by
    /// [`run_queue_stress`].
    pub shards: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            batch: 256,
            capacity: 1024,
            iterations: 10_000,
            shards: 1,
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> PoolResult<()> {
        let fields = [
            ("parallelism", self.parallelism),
            ("batch", self.batch),
            ("capacity", self.capacity),
            ("shards", self.shards),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(PoolError::invalid_config(&format!(
                    "stress {field} must be non-zero"
                )));
            }
        }
        Ok(())
    }
}

/// Summed worker tallies of a stress run.
///
/// For pools, "push" is a release and "pop" is an acquire. Pool releases
/// retry internally and never count as failed; a release that does fail
/// aborts the run with an error instead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StressReport {
    pub push_count: u64,
    pub push_failed: u64,
    pub pop_count: u64,
    pub pop_failed: u64,
    /// CAS retries absorbed inside the queue(s)
    pub contention: QueueCountersSnapshot,
    pub elapsed: Duration,
}

impl StressReport {
    /// Fraction of push attempts that found the queue full
    pub fn push_fail_rate(&self) -> f64 {
        rate(self.push_failed, self.push_count)
    }

    /// Fraction of pop attempts that found the queue empty
    pub fn pop_fail_rate(&self) -> f64 {
        rate(self.pop_failed, self.pop_count)
    }

    /// Attempted operations per second
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        (self.push_count + self.pop_count) as f64 / secs
    }

    fn absorb(&mut self, tally: Tally) {
        self.push_count += tally.push_count;
        self.push_failed += tally.push_failed;
        self.pop_count += tally.pop_count;
        self.pop_failed += tally.pop_failed;
    }
}

fn rate(failed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 / total as f64
    }
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stress Report ({:?}):", self.elapsed)?;
        writeln!(
            f,
            "  push failed rate: {} / {} = {:.6}",
            self.push_failed,
            self.push_count,
            self.push_fail_rate()
        )?;
        writeln!(
            f,
            "  pop failed rate: {} / {} = {:.6}",
            self.pop_failed,
            self.pop_count,
            self.pop_fail_rate()
        )?;
        write!(
            f,
            "  CAS retries: push {}, pop {}",
            self.contention.push_failed, self.contention.pop_failed
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    push_count: u64,
    push_failed: u64,
    pop_count: u64,
    pop_failed: u64,
}

fn join_worker<R>(handle: thread::ScopedJoinHandle<'_, R>) -> PoolResult<R> {
    handle
        .join()
        .map_err(|_| PoolError::broken_invariant(COMPONENT, "worker thread panicked"))
}

/// Join every worker before looking at any outcome. A handle left unjoined
/// inside `thread::scope` re-raises its panic when the scope ends.
fn join_all<R>(workers: Vec<thread::ScopedJoinHandle<'_, R>>) -> Vec<PoolResult<R>> {
    workers.into_iter().map(join_worker).collect()
}

/// Hammer a bare queue pre-loaded with `0..capacity`.
///
/// # Errors
///
/// [`PoolError::InvalidConfig`] for a bad `config`, and
/// [`PoolError::BrokenInvariant`] if the indices drained at the end are not
/// exactly `0..capacity`.
pub fn run_queue_stress<Q: IndexQueue>(config: &StressConfig) -> PoolResult<StressReport> {
    config.validate()?;

    let queue = Q::with_capacity(config.capacity)?;
    for index in 0..config.capacity {
        if !queue.try_push(index) {
            return Err(PoolError::initialization_failed("stress queue"));
        }
    }

    let started = Instant::now();
    let outcomes = thread::scope(|scope| {
        let queue = &queue;
        let workers: Vec<_> = (0..config.parallelism)
            .map(|_| scope.spawn(move || queue_worker(queue, config)))
            .collect();
        join_all(workers)
    })
    .into_iter()
    .collect::<PoolResult<Vec<_>>>()?;
    let elapsed = started.elapsed();

    let mut report = StressReport {
        contention: queue.counters().snapshot(),
        elapsed,
        ..StressReport::default()
    };
    for (tally, held) in outcomes {
        report.absorb(tally);
        for index in held {
            if !queue.try_push(index) {
                return Err(PoolError::broken_invariant(
                    COMPONENT,
                    &format!("queue full while returning held index {index}"),
                ));
            }
        }
    }

    let mut drained: Vec<_> = core::iter::from_fn(|| queue.try_pop()).collect();
    drained.sort_unstable();
    if !drained.iter().copied().eq(0..config.capacity) {
        return Err(PoolError::broken_invariant(
            COMPONENT,
            &format!(
                "{} queue lost or duplicated indices: drained {} of {}",
                queue.kind(),
                drained.len(),
                config.capacity
            ),
        ));
    }

    #[cfg(feature = "logging")]
    debug!(
        queue = %queue.kind(),
        ?elapsed,
        push_fail_rate = report.push_fail_rate(),
        pop_fail_rate = report.pop_fail_rate(),
        "queue stress run finished"
    );

    Ok(report)
}

fn queue_worker<Q: IndexQueue>(queue: &Q, config: &StressConfig) -> (Tally, Vec<usize>) {
    let mut tally = Tally::default();
    let mut cells: Vec<Option<usize>> = vec![None; config.batch];

    for step in 0..config.iterations {
        let cell = &mut cells[step % config.batch];
        match *cell {
            Some(index) => {
                tally.push_count += 1;
                if queue.try_push(index) {
                    *cell = None;
                } else {
                    tally.push_failed += 1;
                }
            }
            None => {
                tally.pop_count += 1;
                match queue.try_pop() {
                    Some(index) => *cell = Some(index),
                    None => tally.pop_failed += 1,
                }
            }
        }
    }

    (tally, cells.into_iter().flatten().collect())
}

/// Hammer `shards` pools of `capacity` slots each.
///
/// Every slot holds a stamp. A worker that acquires a slot swaps its own
/// stamp in and expects to find zero; on release it swaps zero back and
/// expects its own stamp. Any other outcome means two holders shared a slot.
///
/// # Errors
///
/// [`PoolError::InvalidConfig`] for a bad `config`, pool errors from
/// acquire/release, and [`PoolError::BrokenInvariant`] on a stamp mismatch
/// or when a pool is not whole again at the end.
pub fn run_pool_stress<Q: IndexQueue>(config: &StressConfig) -> PoolResult<StressReport> {
    config.validate()?;

    let pools = (0..config.shards)
        .map(|shard| {
            Pool::<AtomicUsize, Q>::with_config(
                PoolConfig::bounded(config.capacity).with_name(format!("stress-{shard}")),
                |_| AtomicUsize::new(0),
            )
        })
        .collect::<PoolResult<Vec<_>>>()?;

    let started = Instant::now();
    let tallies = thread::scope(|scope| {
        let workers: Vec<_> = (0..config.parallelism)
            .map(|worker| {
                let pools = &pools;
                scope.spawn(move || pool_worker(pools, config, worker + 1))
            })
            .collect();
        join_all(workers)
    })
    .into_iter()
    .map(|outcome| outcome.and_then(core::convert::identity))
    .collect::<PoolResult<Vec<_>>>()?;
    let elapsed = started.elapsed();

    let mut report = StressReport {
        elapsed,
        ..StressReport::default()
    };
    for tally in tallies {
        report.absorb(tally);
    }

    for pool in &pools {
        report.contention += pool.queue_counters();
        if pool.available() != pool.capacity() || pool.in_use() != 0 {
            return Err(PoolError::broken_invariant(
                COMPONENT,
                &format!(
                    "pool '{}' not whole after run: {} available, {} in use, capacity {}",
                    pool.name(),
                    pool.available(),
                    pool.in_use(),
                    pool.capacity()
                ),
            ));
        }
    }

    #[cfg(feature = "logging")]
    debug!(
        shards = config.shards,
        ?elapsed,
        pop_fail_rate = report.pop_fail_rate(),
        "pool stress run finished"
    );

    Ok(report)
}

fn pool_worker<Q: IndexQueue>(
    pools: &[Pool<AtomicUsize, Q>],
    config: &StressConfig,
    stamp: usize,
) -> PoolResult<Tally> {
    let mut tally = Tally::default();
    let mut cells: Vec<Option<Handle<'_, AtomicUsize, Q>>> =
        (0..config.batch).map(|_| None).collect();

    for step in 0..config.iterations {
        let cell = &mut cells[step % config.batch];
        match cell.take() {
            Some(handle) => {
                tally.push_count += 1;
                unstamp(&handle, stamp)?;
                handle.release()?;
            }
            None => {
                tally.pop_count += 1;
                match pools[step % pools.len()].acquire()? {
                    Some(handle) => {
                        let previous = handle.swap(stamp, Ordering::AcqRel);
                        if previous != 0 {
                            return Err(PoolError::broken_invariant(
                                COMPONENT,
                                &format!(
                                    "slot {} of pool '{}' handed to worker {stamp} while held by worker {previous}",
                                    handle.index(),
                                    handle.pool().name()
                                ),
                            ));
                        }
                        *cell = Some(handle);
                    }
                    None => tally.pop_failed += 1,
                }
            }
        }
    }

    for handle in cells.into_iter().flatten() {
        unstamp(&handle, stamp)?;
        handle.release()?;
    }
    Ok(tally)
}

fn unstamp<Q: IndexQueue>(handle: &Handle<'_, AtomicUsize, Q>, stamp: usize) -> PoolResult<()> {
    handle
        .compare_exchange(stamp, 0, Ordering::AcqRel, Ordering::Acquire)
        .map(drop)
        .map_err(|found| {
            PoolError::broken_invariant(
                COMPONENT,
                &format!(
                    "slot {} of pool '{}' held by worker {stamp} carries stamp {found}",
                    handle.index(),
                    handle.pool().name()
                ),
            )
        })
}
