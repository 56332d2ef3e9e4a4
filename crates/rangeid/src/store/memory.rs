use core::future::{Future, ready};
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::store::{CounterStore, MAX_COUNTER_VALUE, StoreError};

/// An in-process [`CounterStore`].
///
/// Every increment runs under one short-lived lock, which makes it atomic and
/// linearizable for all allocators in this process. It provides no
/// cross-process coordination, so it suits single-instance deployments, local
/// development and tests.
///
/// ## See Also
/// - [`RedisCounterStore`] for counters shared by a fleet of processes
///
/// [`RedisCounterStore`]: crate::RedisCounterStore
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, u64>>,
}

impl MemoryCounterStore {
    /// Creates an empty store. Every counter starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `key` preset to `total`, as if earlier leases had
    /// already advanced it.
    #[must_use]
    pub fn with_counter(key: impl Into<String>, total: u64) -> Self {
        let store = Self::new();
        store.counters.lock().insert(key.into(), total);
        store
    }

    /// Returns the current total for `key`, or `None` if it was never
    /// incremented.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.lock().get(key).copied()
    }

    fn apply(&self, key: &str, delta: u64) -> Result<u64, StoreError> {
        if delta > MAX_COUNTER_VALUE {
            return Err(StoreError::DeltaOutOfRange(delta));
        }

        let mut counters = self.counters.lock();
        let current = counters.get(key).copied().unwrap_or(0);
        let total = current
            .checked_add(delta)
            .filter(|total| *total <= MAX_COUNTER_VALUE)
            .ok_or_else(|| StoreError::Overflow {
                key: key.to_owned(),
            })?;
        counters.insert(key.to_owned(), total);
        Ok(total)
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(
        &self,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        ready(self.apply(key, delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increments_start_from_zero() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.get("k"), None);
        assert_eq!(store.increment("k", 100).await.unwrap(), 100);
        assert_eq!(store.increment("k", 100).await.unwrap(), 200);
        assert_eq!(store.get("k"), Some(200));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = MemoryCounterStore::with_counter("a", 41);
        assert_eq!(store.increment("a", 1).await.unwrap(), 42);
        assert_eq!(store.increment("b", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_totals_past_the_signed_range() {
        let store = MemoryCounterStore::with_counter("k", MAX_COUNTER_VALUE - 1);
        assert_eq!(store.increment("k", 1).await.unwrap(), MAX_COUNTER_VALUE);

        let err = store.increment("k", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Overflow { ref key } if key == "k"));
        assert_eq!(store.get("k"), Some(MAX_COUNTER_VALUE));
    }

    #[tokio::test]
    async fn rejects_oversized_delta() {
        let store = MemoryCounterStore::new();
        let err = store.increment("k", u64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::DeltaOutOfRange(u64::MAX)));
    }
}
