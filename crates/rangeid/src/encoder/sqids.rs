use std::collections::HashSet;

use ::sqids::Sqids;

use crate::EncoderError;

/// Characters used by [`SqidsEncoder::default`].
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Minimum code length used by [`SqidsEncoder::default`].
pub const DEFAULT_MIN_LENGTH: usize = 16;
/// Largest accepted `min_length`.
pub const MAX_MIN_LENGTH: usize = u8::MAX as usize;

/// Turns sequential integers into short, non-sequential looking codes with
/// [Sqids](https://sqids.org).
///
/// The mapping is deterministic for a given alphabet, minimum length and
/// blocklist, and injective: two different values never share a code. Codes
/// only contain alphabet characters and are padded up to `min_length`. Codes
/// containing a blocked word are skipped in favor of the next candidate, so a
/// code is stable only as long as the blocklist is.
///
/// This is obfuscation, not encryption. Anyone holding the alphabet can
/// decode a code back into its value.
///
/// # Example
/// ```
/// use rangeid::SqidsEncoder;
///
/// let encoder = SqidsEncoder::default();
/// let code = encoder.encode(1).unwrap();
/// assert_eq!(code.len(), 16);
/// assert_eq!(encoder.decode(&code), Some(1));
/// ```
#[derive(Clone, Debug)]
pub struct SqidsEncoder {
    sqids: Sqids,
    min_length: usize,
}

impl Default for SqidsEncoder {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("default alphabet and minimum length are valid")
    }
}

impl SqidsEncoder {
    pub fn builder() -> SqidsEncoderBuilder {
        SqidsEncoderBuilder::default()
    }

    pub const fn min_length(&self) -> usize {
        self.min_length
    }

    /// Encodes `value` into a code of at least `min_length` characters.
    ///
    /// # Errors
    /// [`EncoderError::Blocked`] if every candidate code for `value`
    /// contains a blocked word. With the default blocklist and an alphabet of
    /// reasonable size this does not happen in practice.
    pub fn encode(&self, value: u64) -> Result<String, EncoderError> {
        self.sqids
            .encode(&[value])
            .map_err(|_| EncoderError::Blocked { value })
    }

    /// Decodes a code produced by [`Self::encode`].
    ///
    /// Returns `None` for anything this encoder would not have produced:
    /// foreign characters, codes holding several numbers, values that do not
    /// fit in a `u64`, and non-canonical spellings of a valid value.
    pub fn decode(&self, code: &str) -> Option<u64> {
        let value = match self.sqids.decode(code).as_slice() {
            &[value] => value,
            _ => return None,
        };
        (self.encode(value).ok()? == code).then_some(value)
    }
}

/// Builds a [`SqidsEncoder`] with a custom alphabet, minimum length or
/// blocklist.
#[derive(Clone, Debug)]
pub struct SqidsEncoderBuilder {
    alphabet: String,
    min_length: usize,
    blocklist: Option<HashSet<String>>,
}

impl Default for SqidsEncoderBuilder {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_owned(),
            min_length: DEFAULT_MIN_LENGTH,
            blocklist: None,
        }
    }
}

impl SqidsEncoderBuilder {
    #[must_use]
    pub fn alphabet(mut self, alphabet: impl Into<String>) -> Self {
        self.alphabet = alphabet.into();
        self
    }

    #[must_use]
    pub const fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Replaces the Sqids default blocklist. Words are matched
    /// case-insensitively; an empty set disables blocking.
    #[must_use]
    pub fn blocklist<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.blocklist = Some(words.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the options and builds the encoder.
    ///
    /// # Errors
    /// - [`EncoderError::MinLengthTooLarge`] for `min_length` above
    ///   [`MAX_MIN_LENGTH`]
    /// - [`EncoderError::Alphabet`] for alphabets shorter than 3 characters,
    ///   with repeated characters, or with multi-byte characters
    pub fn build(self) -> Result<SqidsEncoder, EncoderError> {
        let Ok(min_length) = u8::try_from(self.min_length) else {
            return Err(EncoderError::MinLengthTooLarge {
                min_length: self.min_length,
                max: MAX_MIN_LENGTH,
            });
        };

        let mut builder = Sqids::builder()
            .alphabet(self.alphabet.chars().collect())
            .min_length(min_length);
        if let Some(blocklist) = self.blocklist {
            builder = builder.blocklist(blocklist);
        }

        let sqids = builder.build().map_err(EncoderError::Alphabet)?;
        Ok(SqidsEncoder {
            sqids,
            min_length: self.min_length,
        })
    }
}
