/// Configuration options for [`TableParser`](crate::TableParser).
///
/// # Default
///
/// Speculative parsing is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserOptions {
    /// Whether records are parsed tentatively.
    ///
    /// A speculative failure is reported as
    /// [`ParseError::SpeculativeParseFailed`](crate::ParseError::SpeculativeParseFailed)
    /// and the caller is expected to rewind the reader and retry or hand the
    /// record to a fallback parser. With speculation off the same failures
    /// are reported as [`ParseError::Record`](crate::ParseError::Record).
    ///
    /// Table corruption is fatal either way.
    ///
    /// # Default
    ///
    /// `true`
    pub speculative: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { speculative: true }
    }
}
