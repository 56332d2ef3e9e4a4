use core::{future::Future, num::NonZeroU64, time::Duration};
use std::{collections::HashSet, sync::Arc};

use portable_atomic::{AtomicU64, Ordering};
use tokio::task::JoinSet;

use crate::{
    AllocatorConfig, Claim, CounterStore, Error, MemoryCounterStore, RangeAllocator, StoreError,
    TokioSleep, TokioYield,
};

const KEY: &str = "tracking_number_counter";

/// Counts calls, can be slowed down, and can fail a number of upcoming calls.
#[derive(Default)]
struct MockStore {
    total: AtomicU64,
    calls: AtomicU64,
    failures: AtomicU64,
    latency: Duration,
}

impl MockStore {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn failing(self, failures: u64) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CounterStore for MockStore {
    fn increment(
        &self,
        _key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let failed = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(StoreError::Backend("connection refused".to_owned()));
            }
            Ok(self.total.fetch_add(delta, Ordering::SeqCst) + delta)
        }
    }
}

/// Always answers with the same total.
struct FixedStore(u64);

impl CounterStore for FixedStore {
    fn increment(
        &self,
        _key: &str,
        _delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        core::future::ready(Ok(self.0))
    }
}

fn config(batch_size: u64) -> AllocatorConfig {
    AllocatorConfig::new(KEY, NonZeroU64::new(batch_size).unwrap())
        .with_retry_delay(Duration::from_millis(1))
}

fn allocator(batch_size: u64) -> Arc<RangeAllocator<MockStore>> {
    Arc::new(RangeAllocator::new(MockStore::default(), config(batch_size)))
}

/// Spawns `tasks` tasks that each acquire `per_task` values and returns all of
/// them.
async fn acquire_concurrently<S>(
    allocator: &Arc<RangeAllocator<S>>,
    tasks: usize,
    per_task: usize,
) -> Vec<u64>
where
    S: CounterStore + 'static,
{
    let mut set = JoinSet::new();
    for _ in 0..tasks {
        let allocator = Arc::clone(allocator);
        set.spawn(async move {
            let mut values = Vec::with_capacity(per_task);
            for _ in 0..per_task {
                values.push(allocator.acquire().await.unwrap());
            }
            values
        });
    }

    let mut all = Vec::with_capacity(tasks * per_task);
    while let Some(res) = set.join_next().await {
        all.extend(res.unwrap());
    }
    all
}

fn assert_unique(values: &[u64]) {
    let unique: HashSet<_> = values.iter().copied().collect();
    assert_eq!(unique.len(), values.len(), "duplicate values handed out");
}

#[tokio::test]
async fn starts_with_an_empty_window() {
    let allocator = allocator(10);
    let window = allocator.window();
    assert!(window.is_exhausted());
    assert_eq!(window.remaining(), 0);
    assert!(!allocator.is_refilling());
    assert_eq!(allocator.refill_count(), 0);
}

#[tokio::test]
async fn first_acquire_leases_the_first_batch() {
    let allocator = allocator(10);

    assert_eq!(allocator.acquire().await.unwrap(), 1);
    assert_eq!(allocator.store().calls(), 1);

    let window = allocator.window();
    assert_eq!((window.next, window.end), (2, 11));
    assert_eq!(window.remaining(), 9);
}

#[tokio::test]
async fn crossing_a_batch_boundary_refills_once() {
    let allocator = allocator(100);

    for expected in 1..=100 {
        assert_eq!(allocator.acquire().await.unwrap(), expected);
    }
    assert_eq!(allocator.store().calls(), 1);
    assert!(allocator.window().is_exhausted());

    assert_eq!(allocator.acquire().await.unwrap(), 101);
    assert_eq!(allocator.store().calls(), 2);
    assert_eq!(allocator.refill_count(), 2);
}

#[tokio::test]
async fn resumes_after_ranges_leased_elsewhere() {
    let store = MemoryCounterStore::with_counter(KEY, 100);
    let allocator = RangeAllocator::new(store, config(100));

    assert_eq!(allocator.acquire().await.unwrap(), 101);
    assert_eq!(allocator.acquire().await.unwrap(), 102);
    assert_eq!(allocator.store().get(KEY), Some(200));
}

#[tokio::test]
async fn batch_of_one_calls_the_store_every_time() {
    let allocator = allocator(1);

    for expected in 1..=10 {
        assert_eq!(allocator.acquire().await.unwrap(), expected);
    }
    assert_eq!(allocator.store().calls(), 10);
}

#[tokio::test]
async fn several_refills_never_repeat_values() {
    let allocator = allocator(4);

    let mut values = Vec::new();
    for _ in 0..20 {
        values.push(allocator.acquire().await.unwrap());
    }

    assert_eq!(values, (1..=20).collect::<Vec<_>>());
    assert_eq!(allocator.store().calls(), 5);
}

#[tokio::test]
async fn try_claim_never_touches_the_store() {
    let allocator = allocator(3);
    assert_eq!(allocator.try_claim(), Claim::Exhausted);
    assert_eq!(allocator.store().calls(), 0);

    assert_eq!(allocator.acquire().await.unwrap(), 1);
    assert_eq!(allocator.try_claim(), Claim::Ready { value: 2 });
    assert_eq!(allocator.try_claim(), Claim::Ready { value: 3 });
    assert_eq!(allocator.try_claim(), Claim::Exhausted);
    assert_eq!(allocator.store().calls(), 1);

    // Exhausted claims push the cursor past the end; the next refill still
    // starts from the store's total.
    assert_eq!(allocator.acquire().await.unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_within_one_batch_share_a_single_refill() {
    let allocator = allocator(100);

    let values = acquire_concurrently(&allocator, 10, 10).await;

    assert_eq!(values.len(), 100);
    assert_unique(&values);
    assert_eq!(allocator.store().calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_spanning_two_batches_refill_twice() {
    let allocator = allocator(100);

    let values = acquire_concurrently(&allocator, 2, 100).await;

    assert_eq!(values.len(), 200);
    assert_unique(&values);
    assert_eq!(values.iter().max(), Some(&200));
    assert_eq!(allocator.store().calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn heavy_contention_costs_one_refill_per_batch() {
    let allocator = allocator(100);

    let values = acquire_concurrently(&allocator, 100, 1000).await;

    assert_eq!(values.len(), 100_000);
    assert_unique(&values);
    assert_eq!(allocator.store().calls(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn thousand_callers_with_batch_of_one() {
    let allocator = allocator(1);

    let values = acquire_concurrently(&allocator, 1000, 1).await;

    assert_eq!(values.len(), 1000);
    assert_unique(&values);
    assert_eq!(allocator.store().calls(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_callers_do_not_call_the_store() {
    let allocator = Arc::new(RangeAllocator::new(
        MockStore::with_latency(Duration::from_millis(50)),
        config(1000),
    ));

    let values = acquire_concurrently(&allocator, 50, 1).await;

    assert_eq!(values.len(), 50);
    assert_unique(&values);
    assert_eq!(allocator.store().calls(), 1);
}

#[tokio::test]
async fn failed_refill_is_reported_and_recoverable() {
    let allocator = RangeAllocator::new(MockStore::default().failing(1), config(10));

    let err = allocator.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        Error::StoreUnavailable(StoreError::Backend(ref msg)) if msg == "connection refused"
    ));
    assert!(err.is_retryable());
    assert!(!allocator.is_refilling());
    assert_eq!(allocator.refill_count(), 0);

    assert_eq!(allocator.acquire().await.unwrap(), 1);
    assert_eq!(allocator.store().calls(), 2);
    assert_eq!(allocator.refill_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_reaches_only_the_refilling_caller() {
    let allocator = Arc::new(RangeAllocator::new(
        MockStore::with_latency(Duration::from_millis(20)).failing(1),
        config(100),
    ));

    let mut set = JoinSet::new();
    for _ in 0..10 {
        let allocator = Arc::clone(&allocator);
        set.spawn(async move { allocator.acquire().await });
    }

    let mut values = Vec::new();
    let mut failures = 0;
    while let Some(res) = set.join_next().await {
        match res.unwrap() {
            Ok(value) => values.push(value),
            Err(Error::StoreUnavailable(_)) => failures += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(failures, 1);
    assert_eq!(values.len(), 9);
    assert_unique(&values);
    assert_eq!(allocator.store().calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn allocators_sharing_a_store_never_overlap() {
    let store = Arc::new(MemoryCounterStore::new());
    let a = Arc::new(RangeAllocator::new(Arc::clone(&store), config(100)));
    let b = Arc::new(RangeAllocator::new(Arc::clone(&store), config(100)));

    let (from_a, from_b) = tokio::join!(
        acquire_concurrently(&a, 4, 250),
        acquire_concurrently(&b, 4, 250),
    );

    let mut all = from_a;
    all.extend(from_b);
    assert_eq!(all.len(), 2000);
    assert_unique(&all);
    assert_eq!(store.get(KEY), Some(2000));
}

#[tokio::test]
async fn rejects_totals_that_cannot_hold_a_batch() {
    let allocator = RangeAllocator::new(FixedStore(5), config(10));

    let err = allocator.acquire().await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTotal { total: 5, batch_size: 10, .. }
    ));
    assert!(!err.is_retryable());
    assert!(!allocator.is_refilling());
    assert!(allocator.window().is_exhausted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiting_caller_gives_up_after_the_wait_timeout() {
    let allocator = Arc::new(RangeAllocator::new(
        MockStore::with_latency(Duration::from_millis(300)),
        config(10).with_wait_timeout(Some(Duration::from_millis(20))),
    ));

    let refiller = {
        let allocator = Arc::clone(&allocator);
        tokio::spawn(async move { allocator.acquire().await })
    };
    while !allocator.is_refilling() {
        tokio::task::yield_now().await;
    }

    let err = allocator.acquire().await.unwrap_err();
    assert!(matches!(err, Error::RefillWaitTimeout(d) if d == Duration::from_millis(20)));

    assert_eq!(refiller.await.unwrap().unwrap(), 1);
    assert_eq!(allocator.store().calls(), 1);
}

#[tokio::test]
async fn cancelled_refill_releases_the_gate() {
    let allocator = RangeAllocator::new(
        MockStore::with_latency(Duration::from_millis(200)),
        config(10),
    );

    let res = tokio::time::timeout(Duration::from_millis(10), allocator.acquire()).await;
    assert!(res.is_err());
    assert!(!allocator.is_refilling());

    assert_eq!(allocator.acquire().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn yielding_waiters_behave_like_sleeping_ones() {
    let allocator = allocator(50);

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let allocator = Arc::clone(&allocator);
        set.spawn(async move {
            let mut values = Vec::new();
            for _ in 0..25 {
                values.push(allocator.acquire_with::<TokioYield>().await.unwrap());
            }
            values
        });
    }

    let mut all = Vec::new();
    while let Some(res) = set.join_next().await {
        all.extend(res.unwrap());
    }
    assert_eq!(all.len(), 200);
    assert_unique(&all);
    assert_eq!(allocator.store().calls(), 4);

    assert_eq!(allocator.acquire_with::<TokioSleep>().await.unwrap(), 201);
}
