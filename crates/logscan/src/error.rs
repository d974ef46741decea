use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised by [`ScanBuffer`](crate::ScanBuffer) and token resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("failed to allocate a buffer block of {requested} bytes")]
    ResourceExhausted { requested: usize },
    #[error("{requested} bytes do not fit a buffer of capacity {capacity}")]
    InsufficientCapacity { requested: usize, capacity: usize },
    #[error("token refers to storage that was reset or overwritten")]
    StaleToken,
}

/// Errors raised by [`StreamReader`](crate::StreamReader).
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error(
        "refill would overwrite unconsumed data (read cursor {read_cursor}, commit point {committed})"
    )]
    UnsafeRefill { read_cursor: u64, committed: u64 },
    #[error("input has already been closed")]
    InputClosed,
    #[error("requested {requested} bytes but only {available} are buffered")]
    Starved { requested: usize, available: usize },
    #[error("no delimiter among the {available} buffered bytes")]
    Undelimited { available: usize },
    #[error("a span of {len} bytes does not fit a buffer of capacity {capacity}")]
    SpanTooLong { len: usize, capacity: usize },
    #[error(transparent)]
    Buffer(#[from] ScanError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Whether more input, or a larger buffer to hold it, could cure the
    /// failure.
    #[must_use]
    pub fn is_starved(&self) -> bool {
        matches!(
            self,
            Self::Starved { .. } | Self::Undelimited { .. } | Self::SpanTooLong { .. }
        )
    }
}

/// Errors raised when framing values for the IR stream.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("payload of {len} bytes exceeds the largest length class ({max} bytes)")]
    OversizedPayload { len: usize, max: usize },
    #[error("failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by [`RecordTokenizer`](crate::RecordTokenizer).
#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
