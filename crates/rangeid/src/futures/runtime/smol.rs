use core::{future::Future, time::Duration};

use smol::Timer;

use crate::futures::SleepProvider;

/// An implementation of [`SleepProvider`] using Smol's timer.
///
/// This is the default provider for use in async applications built on Smol.
pub struct SmolSleep;
impl SleepProvider for SmolSleep {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send {
        async move {
            Timer::after(dur).await;
        }
    }
}

/// An implementation of [`SleepProvider`] using Smol's yield.
///
/// See `TokioYield` for the trade-off against a timer.
pub struct SmolYield;
impl SleepProvider for SmolYield {
    fn sleep_for(_dur: Duration) -> impl Future<Output = ()> + Send {
        smol::future::yield_now()
    }
}
