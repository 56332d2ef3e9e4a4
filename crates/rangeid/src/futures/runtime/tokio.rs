use core::{future::Future, time::Duration};

use crate::futures::SleepProvider;

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider for use in async applications built on Tokio.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(dur)
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Waiting callers re-check the window as soon as the scheduler comes back to
/// them instead of waiting out the retry delay. That shortens the wait after a
/// fast refill but spins harder while a slow one is in flight; with many
/// waiters a timer-based sleep (e.g., [`TokioSleep`]) is usually cheaper.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        tokio::task::yield_now()
    }
}
