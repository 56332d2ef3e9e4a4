use core::{num::NonZeroU64, time::Duration};

/// Delay a waiting caller sleeps before re-checking a window that another
/// caller is refilling.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Construction-time settings of a [`RangeAllocator`].
///
/// [`RangeAllocator`]: crate::RangeAllocator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Name of the shared counter. Every process issuing from the same
    /// sequence must use the same key.
    pub key: String,
    /// Number of integers leased per counter store round-trip.
    pub batch_size: NonZeroU64,
    /// Per-iteration delay while another caller's refill is in flight.
    pub retry_delay: Duration,
    /// Total time a caller may spend waiting on other callers' refills before
    /// giving up. `None` waits for as long as it takes.
    pub wait_timeout: Option<Duration>,
}

impl AllocatorConfig {
    /// Creates a config with [`DEFAULT_RETRY_DELAY`] and no wait timeout.
    pub fn new(key: impl Into<String>, batch_size: NonZeroU64) -> Self {
        Self {
            key: key.into(),
            batch_size,
            retry_delay: DEFAULT_RETRY_DELAY,
            wait_timeout: None,
        }
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub const fn with_wait_timeout(mut self, wait_timeout: Option<Duration>) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }
}
