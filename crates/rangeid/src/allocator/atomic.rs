use std::time::Instant;

use portable_atomic::{AtomicBool, AtomicU64, AtomicU128, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

#[cfg(feature = "async-tokio")]
use crate::TokioSleep;
use crate::{
    AllocatorConfig, Claim, CounterStore, Error, MAX_COUNTER_VALUE, Result, SleepProvider,
    Window,
};

/// A lock-free allocator handing out unique integers from ranges leased off a
/// shared [`CounterStore`].
///
/// Each refill increments the shared counter by `batch_size` and keeps the
/// resulting range `(total - batch_size, total]` for this instance. Values in
/// the current window are handed out with a single atomic add, without
/// touching the store. When the window runs dry, exactly one caller leases the
/// next range while every other caller waits for it to land.
///
/// ## Guarantees
/// - No value is handed out twice, within one allocator or across allocators
///   sharing a store and key.
/// - Values from one instance are strictly increasing per refill and start at
///   `1`. Ordering across instances is not preserved.
/// - A store round-trip happens only when the window is exhausted, so `N`
///   successful acquisitions cost exactly `ceil(N / batch_size)` increments.
/// - A failed refill surfaces to the caller that attempted it and leaves the
///   allocator usable.
///
/// ## Caveats
/// Unused values are lost when the process stops. Sequences therefore have
/// gaps, and totals only ever move forward.
///
/// ## State
/// The cursor and the exclusive end of the window live in one
/// [`AtomicU128`] (end in the high half, cursor in the low half). A claim is a
/// `fetch_add(1)` on the whole word, so every claim observes a cursor and an
/// end belonging to the same window, and publishing a new window is a single
/// store. Totals are capped at [`MAX_COUNTER_VALUE`], which leaves the cursor
/// half ample headroom before it could carry into the end.
///
/// ## See Also
/// - [`MemoryCounterStore`]
/// - [`RedisCounterStore`]
///
/// [`MemoryCounterStore`]: crate::MemoryCounterStore
/// [`RedisCounterStore`]: crate::RedisCounterStore
pub struct RangeAllocator<S>
where
    S: CounterStore,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU128>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU128,
    refilling: AtomicBool,
    refills: AtomicU64,
    store: S,
    config: AllocatorConfig,
}

impl<S> RangeAllocator<S>
where
    S: CounterStore,
{
    /// Creates an allocator with an empty window. The first acquisition
    /// performs the first refill.
    ///
    /// # Example
    /// ```
    /// use core::num::NonZeroU64;
    /// use rangeid::{AllocatorConfig, Claim, MemoryCounterStore, RangeAllocator};
    ///
    /// let config = AllocatorConfig::new("orders", NonZeroU64::new(100).unwrap());
    /// let allocator = RangeAllocator::new(MemoryCounterStore::new(), config);
    ///
    /// // Nothing is leased until someone asks for a value.
    /// assert_eq!(allocator.try_claim(), Claim::Exhausted);
    /// assert_eq!(allocator.refill_count(), 0);
    /// ```
    pub fn new(store: S, config: AllocatorConfig) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU128::new(pack(0, 0))),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU128::new(pack(0, 0)),
            refilling: AtomicBool::new(false),
            refills: AtomicU64::new(0),
            store,
            config,
        }
    }

    /// Claims the next value of the current window without touching the
    /// store.
    ///
    /// Returns [`Claim::Exhausted`] when the window is used up. A claim that
    /// finds the window exhausted still advances the cursor, which is harmless
    /// since the next refill replaces the whole window.
    pub fn try_claim(&self) -> Claim {
        let (cursor, end) = unpack(self.state.fetch_add(1, Ordering::AcqRel));
        if cursor < end {
            Claim::Ready { value: cursor }
        } else {
            Claim::Exhausted
        }
    }

    /// Returns the next unique value, refilling the window from the store if
    /// needed and sleeping with `P` while another caller's refill is in
    /// flight.
    ///
    /// # Errors
    /// - [`Error::StoreUnavailable`] if this caller performed the refill and
    ///   the store call failed
    /// - [`Error::InvalidTotal`] if the store answered with a total that
    ///   cannot hold a fresh lease
    /// - [`Error::RefillWaitTimeout`] if a wait timeout is configured and
    ///   other callers' refills took longer than that
    ///
    /// Cancelling the returned future mid-refill releases the refill gate; the
    /// range the store may already have leased is then lost.
    pub async fn acquire_with<P>(&self) -> Result<u64>
    where
        P: SleepProvider,
    {
        let mut waiting_since: Option<Instant> = None;

        loop {
            if let Claim::Ready { value } = self.try_claim() {
                return Ok(value);
            }

            if let Some(_gate) = RefillGate::try_acquire(&self.refilling) {
                // A refill may have landed between the failed claim and taking
                // the gate.
                if let Claim::Ready { value } = self.try_claim() {
                    return Ok(value);
                }
                return self.refill().await;
            }

            if !self.window().is_exhausted() {
                continue;
            }

            let started = *waiting_since.get_or_insert_with(Instant::now);
            if let Some(limit) = self.config.wait_timeout {
                if started.elapsed() >= limit {
                    return Err(Error::RefillWaitTimeout(limit));
                }
            }
            P::sleep_for(self.config.retry_delay).await;
        }
    }

    /// Returns the next unique value using [`TokioSleep`] while waiting on
    /// other callers' refills.
    ///
    /// # Errors
    /// See [`Self::acquire_with`].
    #[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
    #[cfg(feature = "async-tokio")]
    pub async fn acquire(&self) -> Result<u64> {
        self.acquire_with::<TokioSleep>().await
    }

    /// Leases the next range and publishes it. Must be called with the refill
    /// gate held and the window exhausted.
    ///
    /// The first value of the new range goes straight to the caller; the rest
    /// becomes the window.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(key = %self.config.key))
    )]
    async fn refill(&self) -> Result<u64> {
        let batch_size = self.config.batch_size.get();

        let total = match self.store.increment(&self.config.key, batch_size).await {
            Ok(total) => total,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Range refill failed: {e}");
                return Err(e.into());
            }
        };

        let Some((start, end)) = lease_bounds(total, batch_size) else {
            return Err(Error::InvalidTotal {
                key: self.config.key.clone(),
                total,
                batch_size,
            });
        };

        self.state.store(pack(start + 1, end), Ordering::Release);
        self.refills.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::info!("Leased range [{start}, {end})");

        Ok(start)
    }

    /// Returns a snapshot of the current window.
    pub fn window(&self) -> Window {
        let (next, end) = unpack(self.state.load(Ordering::Acquire));
        Window { next, end }
    }

    /// Returns `true` while some caller holds the refill gate.
    pub fn is_refilling(&self) -> bool {
        self.refilling.load(Ordering::Acquire)
    }

    /// Number of refills that completed successfully.
    pub fn refill_count(&self) -> u64 {
        self.refills.load(Ordering::Relaxed)
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S> core::fmt::Debug for RangeAllocator<S>
where
    S: CounterStore,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RangeAllocator")
            .field("config", &self.config)
            .field("window", &self.window())
            .field("refilling", &self.is_refilling())
            .field("refills", &self.refill_count())
            .finish_non_exhaustive()
    }
}

/// Exclusive right to refill. Dropping it reopens the gate, whether the
/// refill succeeded, failed, or its future was cancelled.
struct RefillGate<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RefillGate<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RefillGate<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Turns a post-increment total into the leased half-open range
/// `[total - batch_size + 1, total + 1)`.
const fn lease_bounds(total: u64, batch_size: u64) -> Option<(u64, u64)> {
    if total < batch_size || total > MAX_COUNTER_VALUE {
        return None;
    }
    Some((total - batch_size + 1, total + 1))
}

const fn pack(cursor: u64, end: u64) -> u128 {
    ((end as u128) << 64) | cursor as u128
}

const fn unpack(raw: u128) -> (u64, u64) {
    (raw as u64, (raw >> 64) as u64)
}
