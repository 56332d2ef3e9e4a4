use core::time::Duration;

use crate::{EncoderError, store::StoreError};

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors a [`RangeAllocator`] or [`Issuer`] can surface to its callers.
///
/// Counter store failures are never retried by the allocator. They are wrapped
/// in [`Error::StoreUnavailable`] with the original failure kept as the
/// [`source`](core::error::Error::source), and the caller decides whether to
/// try again.
///
/// [`RangeAllocator`]: crate::RangeAllocator
/// [`Issuer`]: crate::Issuer
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The counter store call made to refill the window failed.
    #[error("counter store unavailable")]
    StoreUnavailable(#[source] StoreError),

    /// The counter store answered with a total that cannot describe a freshly
    /// leased range: smaller than the batch, or beyond
    /// [`MAX_COUNTER_VALUE`](crate::MAX_COUNTER_VALUE).
    #[error("counter `{key}` returned total {total}, which cannot hold a lease of {batch_size}")]
    InvalidTotal {
        key: String,
        total: u64,
        batch_size: u64,
    },

    /// A waiting caller gave up on a concurrent refill after the configured
    /// wait budget.
    #[error("gave up waiting for a concurrent range refill after {0:?}")]
    RefillWaitTimeout(Duration),

    /// The allocated value could not be turned into a code. The value itself
    /// is consumed.
    #[error("failed to encode value")]
    Encoding(#[from] EncoderError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err)
    }
}

impl Error {
    /// Returns `true` if the failure came from the counter store and a later
    /// attempt may succeed once it recovers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::RefillWaitTimeout(_))
    }
}
