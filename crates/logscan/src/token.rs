//! Zero-copy token spans.
//!
//! A [`Token`] is a plain `Copy` handle: it names a block of a
//! [`ScanBuffer`](crate::ScanBuffer), the buffer generation it was issued in,
//! and a `[start, end)` span that may wrap past the end of the block. It
//! carries no borrow, so the reader stays free to advance while tokens of the
//! current record are collected. Reading the bytes goes through
//! [`ScanBuffer::view`](crate::ScanBuffer::view) or
//! [`StreamReader::view`](crate::StreamReader::view), which refuse handles from
//! an older generation instead of reading reused memory.

use alloc::vec::Vec;
use core::fmt;

use bstr::{BStr, BString, ByteSlice};

/// What a token represents within its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldTag {
    /// A leading fixed field such as a timestamp.
    Metadata,
    /// Static text read while classifying the record.
    Static,
    /// A variable field of the detected record type.
    Variable,
    /// A skipped delimiter run.
    Delimiter,
}

/// A non-owning, possibly wrapping span of buffer storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub(crate) block: usize,
    pub(crate) generation: u64,
    pub(crate) capacity: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) stream_offset: u64,
    pub(crate) tag: FieldTag,
}

impl Token {
    /// Logical length. A wrapping span covers `[start, capacity) ++ [0, end)`.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.start <= self.end {
            self.end - self.start
        } else {
            self.capacity - self.start + self.end
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the span continues at the beginning of the block.
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Capacity of the block the span lives in.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn tag(&self) -> FieldTag {
        self.tag
    }

    /// Absolute offset of the first byte within the ingested stream.
    #[must_use]
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }

    #[must_use]
    pub fn with_tag(self, tag: FieldTag) -> Self {
        Self { tag, ..self }
    }
}

/// A resolved token: the span together with the block it points into.
#[derive(Clone, Copy)]
pub struct TokenView<'buf> {
    token: Token,
    storage: &'buf [u8],
}

impl<'buf> TokenView<'buf> {
    pub(crate) fn new(token: Token, storage: &'buf [u8]) -> Self {
        debug_assert_eq!(token.capacity, storage.len());
        Self { token, storage }
    }

    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.token.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// The span as two contiguous pieces; the second is empty unless the span
    /// wraps.
    #[must_use]
    pub fn segments(&self) -> (&'buf [u8], &'buf [u8]) {
        let Token { start, end, .. } = self.token;
        if start <= end {
            (&self.storage[start..end], &[])
        } else {
            (&self.storage[start..], &self.storage[..end])
        }
    }

    /// The byte `index` positions after the start of the span.
    #[must_use]
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        if index >= self.len() {
            return None;
        }
        let pos = self.token.start + index;
        let pos = if pos >= self.token.capacity {
            pos - self.token.capacity
        } else {
            pos
        };
        Some(self.storage[pos])
    }

    /// The single byte at the start of the span, for tokens that stand for one
    /// delimiter.
    #[must_use]
    pub fn delimiter(&self) -> Option<u8> {
        self.byte_at(0)
    }

    /// Iterates over the bytes of the span in logical order.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + 'buf {
        let (head, tail) = self.segments();
        head.iter().chain(tail).copied()
    }

    /// Copies the span into an owned string, joining the wrap segments.
    #[must_use]
    pub fn materialize(&self) -> BString {
        let (head, tail) = self.segments();
        let mut out = Vec::with_capacity(head.len() + tail.len());
        out.extend_from_slice(head);
        out.extend_from_slice(tail);
        BString::from(out)
    }
}

impl PartialEq<[u8]> for TokenView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        let (head, tail) = self.segments();
        other.len() == head.len() + tail.len()
            && other[..head.len()] == *head
            && other[head.len()..] == *tail
    }
}

impl PartialEq<&str> for TokenView<'_> {
    fn eq(&self, other: &&str) -> bool {
        *self == *other.as_bytes()
    }
}

impl fmt::Debug for TokenView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenView")
            .field("tag", &self.token.tag)
            .field("bytes", &self.materialize())
            .finish()
    }
}

impl fmt::Display for TokenView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tail) = self.segments();
        write!(f, "{}{}", head.as_bstr(), BStr::new(tail))
    }
}
