//! Pool behaviour under concurrency, for every linearizable queue algorithm.

use std::sync::Barrier;
use std::thread;

use nebula_mempool::{AnyQueue, Pool, PoolConfig, QueueKind, SlotIndex};
use parking_lot::Mutex;
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pool_on(kind: QueueKind, capacity: usize) -> Pool<u64, AnyQueue> {
    Pool::with_parts(
        PoolConfig::bounded(capacity).with_name(kind.as_str()),
        AnyQueue::new(kind, capacity).unwrap(),
        |index| index.get() as u64,
    )
    .unwrap()
}

fn assert_whole(pool: &Pool<u64, AnyQueue>) {
    assert_eq!(pool.available(), pool.capacity(), "{}", pool.name());
    assert_eq!(pool.in_use(), 0, "{}", pool.name());
    assert_eq!(pool.available() + pool.in_use(), pool.capacity());
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[rstest]
#[case::ticket(QueueKind::Ticket)]
#[case::packed(QueueKind::Packed)]
#[case::channel(QueueKind::Channel)]
fn capacity_one_serves_exactly_one_thread(#[case] kind: QueueKind) {
    let pool = pool_on(kind, 1);
    let barrier = Barrier::new(2);
    let winners = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for worker in 0..2 {
            let (pool, barrier, winners) = (&pool, &barrier, &winners);
            scope.spawn(move || {
                barrier.wait();
                if let Some(handle) = pool.try_acquire() {
                    winners.lock().push((worker, handle.detach()));
                }
            });
        }
    });

    let winners = winners.into_inner();
    assert_eq!(winners.len(), 1, "{kind}: exactly one acquire succeeds");
    assert!(pool.try_acquire().is_none(), "{kind}: loser still sees empty");

    let (_, index) = winners[0];
    unsafe { pool.release_index(index) }.unwrap();
    assert!(pool.try_acquire().is_some(), "{kind}: succeeds after release");
}

#[rstest]
#[case::ticket(QueueKind::Ticket)]
#[case::packed(QueueKind::Packed)]
#[case::channel(QueueKind::Channel)]
fn churn_conserves_slots(#[case] kind: QueueKind) {
    const THREADS: usize = 4;
    const ROUNDS: usize = 2_000;

    let pool = pool_on(kind, 8);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let pool = &pool;
            scope.spawn(move || {
                let mut held = Vec::with_capacity(2);
                for round in 0..ROUNDS {
                    if let Some(mut handle) = pool.try_acquire() {
                        // Slots keep their identity across reuse.
                        assert_eq!(*handle % 8, handle.index().get() as u64);
                        *handle += 8;
                        held.push(handle);
                    }
                    if held.len() == 2 || round % 3 == 0 {
                        held.clear();
                    }
                }
            });
        }
    });

    assert_whole(&pool);
    let stats = pool.stats();
    assert_eq!(stats.total_releases(), stats.total_acquires() - stats.total_exhausted());
    assert_eq!(stats.current_in_use(), 0);
    assert!(stats.peak_in_use() <= pool.capacity());
}

#[rstest]
#[case::ticket(QueueKind::Ticket)]
#[case::packed(QueueKind::Packed)]
#[case::increment(QueueKind::Increment)]
#[case::channel(QueueKind::Channel)]
fn exhaust_and_refill(#[case] kind: QueueKind) {
    let pool = pool_on(kind, 4);

    let handles: Vec<_> = (0..4).map(|_| pool.try_acquire().unwrap()).collect();
    assert!(pool.acquire().unwrap().is_none(), "{kind}");
    let err = pool.acquire_or_err().unwrap_err();
    assert!(err.is_retryable(), "{kind}");

    let mut indices: Vec<_> = handles.iter().map(|handle| handle.index()).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..4).map(SlotIndex::new).collect::<Vec<_>>(), "{kind}");

    for handle in handles {
        pool.release(handle).unwrap();
    }
    assert_whole(&pool);
}

#[rstest]
#[case::ticket(QueueKind::Ticket)]
#[case::packed(QueueKind::Packed)]
#[case::channel(QueueKind::Channel)]
fn double_release_is_rejected_once_released(#[case] kind: QueueKind) {
    let pool = pool_on(kind, 3);
    let index = pool.try_acquire().unwrap().detach();

    unsafe { pool.release_index(index) }.unwrap();
    for _ in 0..3 {
        let err = unsafe { pool.release_index(index) }.unwrap_err();
        assert_eq!(err.code(), "MEMPOOL:POOL:DOUBLE_RELEASE", "{kind}");
    }

    // The queue never held more than `capacity` entries.
    assert_whole(&pool);
    let drained: Vec<_> = (0..4).map_while(|_| pool.try_acquire().map(|h| h.detach())).collect();
    assert_eq!(drained.len(), 3, "{kind}");
}

#[test]
fn concurrent_double_release_succeeds_exactly_once() {
    let pool = pool_on(QueueKind::Ticket, 2);
    let index = pool.try_acquire().unwrap().detach();
    let barrier = Barrier::new(4);
    let outcomes = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..4 {
            let (pool, barrier, outcomes) = (&pool, &barrier, &outcomes);
            scope.spawn(move || {
                barrier.wait();
                let outcome = unsafe { pool.release_index(index) };
                outcomes.lock().push(outcome.is_ok());
            });
        }
    });

    let successes = outcomes.into_inner().into_iter().filter(|ok| *ok).count();
    assert_eq!(successes, 1);
    assert_eq!(pool.stats().total_double_releases(), 3);
    assert_whole(&pool);
}

#[test]
fn handle_released_on_another_thread() {
    let pool: Pool<String> = Pool::new(2).unwrap();
    let mut handle = pool.try_acquire().unwrap();
    handle.push_str("moved");

    thread::scope(|scope| {
        scope.spawn(move || {
            assert_eq!(handle.as_str(), "moved");
            handle.release().unwrap();
        });
    });

    assert_eq!(pool.available(), 2);
}

#[test]
fn invalid_index_leaves_pool_untouched() {
    let pool = pool_on(QueueKind::Packed, 2);
    let err = unsafe { pool.release_index(SlotIndex::new(7)) }.unwrap_err();
    assert_eq!(err.code(), "MEMPOOL:POOL:INDEX");
    assert!(!err.is_fatal());
    assert_whole(&pool);
}
