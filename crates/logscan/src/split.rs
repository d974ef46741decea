//! Splitting a message into whitespace and token parts to derive its
//! template.

use alloc::vec::Vec;

use bstr::{BStr, BString, ByteSlice};

use crate::scan::{is_readable, scan_bracket_aware, scan_whitespace};

/// Placeholder written into templates for unreadable tokens.
pub const PLACEHOLDER: &[u8] = b"<*>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// A run of spaces and newlines.
    Whitespace,
    /// A token made of ASCII letters only.
    Readable,
    /// Any other token.
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePart {
    pub offset: usize,
    pub len: usize,
    pub kind: PartKind,
    pub is_metadata: bool,
}

/// A message split into alternating whitespace and token parts.
///
/// Tokens are bracket-aware, so `f(a b)` is one part.
///
/// # Examples
///
/// ```rust
/// use logscan::SplitMessage;
///
/// let mut msg = SplitMessage::new(b"1700000000 retry 3 of job-7");
/// assert!(msg.mark_metadata(0));
/// assert!(msg.mark_metadata(1));
/// assert_eq!(msg.template(), "retry <*> of <*>");
/// ```
#[derive(Debug, Clone)]
pub struct SplitMessage<'a> {
    message: &'a [u8],
    parts: Vec<MessagePart>,
}

impl<'a> SplitMessage<'a> {
    #[must_use]
    pub fn new(message: &'a [u8]) -> Self {
        let mut parts = Vec::new();
        let mut offset = 0;
        let mut in_whitespace = matches!(message.first(), Some(b' ' | b'\n'));

        while offset < message.len() {
            let rest = &message[offset..];
            let peek = |i: usize| rest[i];
            let (len, kind) = if in_whitespace {
                (scan_whitespace(peek, rest.len()), PartKind::Whitespace)
            } else {
                let len = scan_bracket_aware(peek, rest.len()).len;
                let kind = if is_readable(&rest[..len]) {
                    PartKind::Readable
                } else {
                    PartKind::Unreadable
                };
                (len, kind)
            };

            parts.push(MessagePart {
                offset,
                len,
                kind,
                is_metadata: false,
            });
            in_whitespace = !in_whitespace;
            offset += len;
        }

        Self { message, parts }
    }

    #[must_use]
    pub fn message(&self) -> &'a BStr {
        self.message.as_bstr()
    }

    #[must_use]
    pub fn parts(&self) -> &[MessagePart] {
        &self.parts
    }

    /// The bytes of part `index`.
    #[must_use]
    pub fn part(&self, index: usize) -> Option<&'a BStr> {
        self.parts
            .get(index)
            .map(|part| self.message[part.offset..part.offset + part.len].as_bstr())
    }

    /// Flags part `index` as metadata, which drops it from the template.
    /// Returns `false` if there is no such part.
    pub fn mark_metadata(&mut self, index: usize) -> bool {
        match self.parts.get_mut(index) {
            Some(part) => {
                part.is_metadata = true;
                true
            }
            None => false,
        }
    }

    /// Renders the template: metadata parts are dropped, unreadable tokens
    /// become [`PLACEHOLDER`], and everything else is kept verbatim.
    #[must_use]
    pub fn template(&self) -> BString {
        let mut out = Vec::with_capacity(self.message.len());
        for part in self.parts.iter().filter(|part| !part.is_metadata) {
            match part.kind {
                PartKind::Unreadable => out.extend_from_slice(PLACEHOLDER),
                PartKind::Whitespace | PartKind::Readable => {
                    out.extend_from_slice(&self.message[part.offset..part.offset + part.len]);
                }
            }
        }
        BString::from(out)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn kinds(msg: &SplitMessage<'_>) -> Vec<PartKind> {
        msg.parts().iter().map(|part| part.kind).collect()
    }

    #[test]
    fn unreadable_tokens_become_placeholders() {
        let msg = SplitMessage::new(b"Connection to 10.0.0.1 failed after 3 retries");
        assert_eq!(
            msg.template(),
            "Connection to <*> failed after <*> retries"
        );
        assert_eq!(msg.parts().len(), 13);
        assert_eq!(msg.part(4).unwrap(), "10.0.0.1");
    }

    #[test]
    fn metadata_is_dropped() {
        let mut msg = SplitMessage::new(b"2024-01-01  INFO started");
        assert!(msg.mark_metadata(0));
        assert!(msg.mark_metadata(1));
        assert_eq!(msg.part(1).unwrap(), "  ");
        assert_eq!(msg.template(), "INFO started");
    }

    #[test]
    fn brackets_hold_a_token_together() {
        let msg = SplitMessage::new(b"call(a b) ok");
        assert_eq!(
            kinds(&msg),
            [
                PartKind::Unreadable,
                PartKind::Whitespace,
                PartKind::Readable
            ]
        );
        assert_eq!(msg.part(0).unwrap(), "call(a b)");
        assert_eq!(msg.template(), "<*> ok");
    }

    #[test]
    fn leading_and_trailing_whitespace() {
        let msg = SplitMessage::new(b"  hi\n");
        assert_eq!(
            kinds(&msg),
            [
                PartKind::Whitespace,
                PartKind::Readable,
                PartKind::Whitespace
            ]
        );
        assert_eq!(msg.template(), "  hi\n");
        assert!(msg.part(3).is_none());
    }

    #[test]
    fn empty_message() {
        let msg = SplitMessage::new(b"");
        assert!(msg.parts().is_empty());
        assert_eq!(msg.template(), "");
    }

    #[test]
    fn marking_a_missing_part_changes_nothing() {
        let mut msg = SplitMessage::new(b"a b");
        assert!(!msg.mark_metadata(3));
        assert!(!msg.mark_metadata(usize::MAX));
        assert!(msg.parts().iter().all(|part| !part.is_metadata));
        assert_eq!(msg.template(), "a b");
    }

    #[test]
    fn parts_cover_the_message() {
        let msg = SplitMessage::new(b"a [b c] {d} e(f");
        let mut next = 0;
        for part in msg.parts() {
            assert_eq!(part.offset, next);
            assert!(part.len > 0);
            next += part.len;
        }
        assert_eq!(next, msg.message().len());
    }
}
