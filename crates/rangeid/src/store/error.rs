use core::time::Duration;

/// Failures reported by a [`CounterStore`](crate::CounterStore).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached, or the connection broke while a
    /// command was in flight.
    #[error("counter store connection failed: {0}")]
    Connection(String),

    /// The store settings are unusable, such as a malformed URL.
    #[error("invalid counter store configuration: {0}")]
    Config(String),

    /// The store did not answer within the configured timeout.
    #[error("counter store did not respond within {0:?}")]
    Timeout(Duration),

    /// The store received the command and rejected it.
    #[error("counter store rejected the command: {0}")]
    Backend(String),

    /// The store answered with something that is not a valid reply.
    #[error("malformed reply from counter store: {0}")]
    Protocol(String),

    /// The requested delta does not fit the store's signed 64-bit counters.
    #[error("delta {0} is outside the counter range")]
    DeltaOutOfRange(u64),

    /// Adding the delta would push the counter past
    /// [`MAX_COUNTER_VALUE`](crate::MAX_COUNTER_VALUE).
    #[error("counter `{key}` would overflow")]
    Overflow { key: String },
}
