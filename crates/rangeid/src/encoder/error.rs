/// Failures of a [`SqidsEncoder`], either while building it or while encoding.
///
/// [`SqidsEncoder`]: crate::SqidsEncoder
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EncoderError {
    #[error("invalid alphabet")]
    Alphabet(#[source] sqids::Error),
    #[error("min_length must be at most {max}, got {min_length}")]
    MinLengthTooLarge { min_length: usize, max: usize },
    /// Every candidate code for `value` contains a blocked word.
    #[error("every code for {value} contains a blocked word")]
    Blocked { value: u64 },
}
