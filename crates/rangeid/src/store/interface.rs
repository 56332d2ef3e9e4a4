use core::future::Future;
use std::sync::Arc;

use crate::store::StoreError;

/// Largest total any counter may reach.
///
/// Counters are signed 64-bit integers in Redis, so every store caps totals at
/// `i64::MAX` even when it could represent more. Allocators rely on this
/// bound: a window end never exceeds `MAX_COUNTER_VALUE + 1`.
pub const MAX_COUNTER_VALUE: u64 = i64::MAX as u64;

/// A shared counter offering a single atomic "add and fetch" primitive.
///
/// Implementations must be linearizable per key: concurrent calls, from this
/// process or any other sharing the same backing store, each observe a
/// distinct, strictly increasing total.
pub trait CounterStore: Send + Sync {
    /// Atomically adds `delta` to the counter named `key` and returns the new
    /// total. A counter that does not exist yet starts at zero.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be reached, rejects the
    /// command, or the counter would overflow.
    fn increment(
        &self,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

impl<S> CounterStore for Arc<S>
where
    S: CounterStore,
{
    fn increment(
        &self,
        key: &str,
        delta: u64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send {
        (**self).increment(key, delta)
    }
}
