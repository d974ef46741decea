use crate::scan_buffer::DEFAULT_INLINE_CAPACITY;

/// Configuration for a [`StreamReader`](crate::StreamReader).
///
/// # Examples
///
/// ```rust
/// use logscan::{ReaderOptions, StreamReader};
///
/// let reader = StreamReader::new(ReaderOptions {
///     inline_capacity: 4096,
/// });
/// assert_eq!(reader.capacity(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderOptions {
    /// Size in bytes of the base block the ring starts with and returns to on
    /// reset.
    ///
    /// The reader fills the ring half a block at a time, so the value is
    /// rounded up to an even number (and to at least two). Records longer than
    /// the ring make it grow; growth is kept until the next reset.
    ///
    /// # Default
    ///
    /// `60_000`
    pub inline_capacity: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            inline_capacity: DEFAULT_INLINE_CAPACITY,
        }
    }
}
