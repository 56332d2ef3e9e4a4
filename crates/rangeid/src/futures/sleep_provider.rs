use core::{future::Future, time::Duration};

/// A trait that abstracts over how to sleep for a given [`Duration`] in async
/// contexts.
///
/// Allocators wait through a `SleepProvider` while another caller refills the
/// window, which keeps them generic over runtimes like `Tokio` or `Smol`.
pub trait SleepProvider {
    /// Returns a future that completes after `dur`. The future must be `Send`
    /// so callers can hold it across tasks on multi-threaded runtimes.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}
