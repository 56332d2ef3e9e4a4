#[cfg(feature = "async-tokio")]
use crate::TokioSleep;
use crate::{CounterStore, RangeAllocator, Result, SleepProvider, SqidsEncoder};

/// A freshly issued identifier: the raw allocated integer and its public
/// code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackingNumber {
    pub value: u64,
    pub code: String,
}

/// Issues encoded identifiers by pairing a [`RangeAllocator`] with a
/// [`SqidsEncoder`].
///
/// # Example
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rangeid::Result<()> {
/// use core::num::NonZeroU64;
/// use rangeid::{AllocatorConfig, Issuer, MemoryCounterStore, RangeAllocator, SqidsEncoder};
///
/// let config = AllocatorConfig::new("parcels", NonZeroU64::new(1000).unwrap());
/// let issuer = Issuer::new(
///     RangeAllocator::new(MemoryCounterStore::new(), config),
///     SqidsEncoder::default(),
/// );
///
/// let issued = issuer.issue().await?;
/// assert_eq!(issued.value, 1);
/// assert_eq!(issuer.encoder().decode(&issued.code), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Issuer<S>
where
    S: CounterStore,
{
    allocator: RangeAllocator<S>,
    encoder: SqidsEncoder,
}

impl<S> Issuer<S>
where
    S: CounterStore,
{
    pub const fn new(allocator: RangeAllocator<S>, encoder: SqidsEncoder) -> Self {
        Self { allocator, encoder }
    }

    /// Allocates the next value and encodes it.
    ///
    /// # Errors
    /// Whatever [`RangeAllocator::acquire_with`] returns, or
    /// [`Error::Encoding`](crate::Error::Encoding) if the value has no
    /// acceptable code.
    pub async fn issue_with<P>(&self) -> Result<TrackingNumber>
    where
        P: SleepProvider,
    {
        let value = self.allocator.acquire_with::<P>().await?;
        let code = self.encoder.encode(value)?;
        Ok(TrackingNumber { value, code })
    }

    /// Like [`Self::issue_with`], waiting with [`TokioSleep`].
    ///
    /// # Errors
    /// Whatever [`RangeAllocator::acquire_with`] returns.
    #[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
    #[cfg(feature = "async-tokio")]
    pub async fn issue(&self) -> Result<TrackingNumber> {
        self.issue_with::<TokioSleep>().await
    }

    pub const fn allocator(&self) -> &RangeAllocator<S> {
        &self.allocator
    }

    pub const fn encoder(&self) -> &SqidsEncoder {
        &self.encoder
    }
}
