//! Byte-level scanning helpers shared by the buffer, the reader and the
//! message splitter.
//!
//! Scanners in this module never touch storage directly. They take a `peek`
//! closure returning the byte at a relative offset, so the same routine works
//! over a plain slice and over a wrapping ring.

/// Width of one delimiter-search chunk.
///
/// When fewer than `SCAN_CHUNK` bytes remain before the wrap point, the tail
/// is copied into a scratch chunk and padded with [`ByteClass::pad_byte`].
pub const SCAN_CHUNK: usize = 32;

/// A small set of delimiter bytes searched for as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteClass {
    needles: [u8; 3],
    len: u8,
    pad: u8,
}

impl ByteClass {
    /// The space character.
    pub const SPACE: ByteClass = ByteClass::new(b" ");
    /// The line feed character.
    pub const NEWLINE: ByteClass = ByteClass::new(b"\n");
    /// Space or line feed.
    pub const WHITESPACE: ByteClass = ByteClass::new(b" \n");

    /// Builds a class out of one to three bytes.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a const) if `bytes` is empty or
    /// longer than three bytes.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub const fn new(bytes: &[u8]) -> Self {
        assert!(
            !bytes.is_empty() && bytes.len() <= 3,
            "a byte class holds one to three bytes"
        );
        let mut needles = [bytes[0]; 3];
        let mut i = 0;
        while i < bytes.len() {
            needles[i] = bytes[i];
            i += 1;
        }

        // The first byte value outside the class. With at most three members
        // this terminates within four candidates.
        let mut pad = 0u8;
        loop {
            let mut member = false;
            let mut j = 0;
            while j < bytes.len() {
                if bytes[j] == pad {
                    member = true;
                }
                j += 1;
            }
            if !member {
                break;
            }
            pad += 1;
        }

        ByteClass {
            needles,
            len: bytes.len() as u8,
            pad,
        }
    }

    /// The member bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.needles[..usize::from(self.len)]
    }

    /// Whether `byte` belongs to the class.
    #[must_use]
    pub fn contains(&self, byte: u8) -> bool {
        self.bytes().contains(&byte)
    }

    /// A byte guaranteed not to belong to the class, used to pad partial
    /// chunks.
    #[must_use]
    pub fn pad_byte(&self) -> u8 {
        self.pad
    }

    /// Offset of the first member byte in `haystack`.
    pub(crate) fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        let [a, b, c] = self.needles;
        match self.len {
            1 => memchr::memchr(a, haystack),
            2 => memchr::memchr2(a, b, haystack),
            _ => memchr::memchr3(a, b, c, haystack),
        }
    }
}

/// Outcome of [`scan_bracket_aware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketScan {
    /// Length of the token, excluding any terminating delimiter.
    pub len: usize,
    /// Whether the scan stopped on a space or newline at nesting depth zero
    /// (as opposed to running into the limit).
    pub delimited: bool,
}

impl BracketScan {
    /// Bytes covered by the scan including the terminating delimiter, i.e. the
    /// offset at which the next field starts.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.len + usize::from(self.delimited)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Top,
    Paren,
    Bracket,
    Brace,
}

/// Scans a token that may contain spaces inside parentheses, square brackets
/// or braces.
///
/// Only the kind of the outermost open bracket affects the depth: inside
/// `( .. )` a `[` or `}` is ordinary content. The scan stops at the first space
/// or newline seen at depth zero, or after `limit` bytes.
pub fn scan_bracket_aware(mut peek: impl FnMut(usize) -> u8, limit: usize) -> BracketScan {
    let mut nesting = Nesting::Top;
    let mut depth = 0u32;

    for i in 0..limit {
        match (nesting, peek(i)) {
            (Nesting::Top, b' ' | b'\n') => {
                return BracketScan {
                    len: i,
                    delimited: true,
                };
            }
            (Nesting::Top, b'(') => {
                nesting = Nesting::Paren;
                depth = 1;
            }
            (Nesting::Top, b'[') => {
                nesting = Nesting::Bracket;
                depth = 1;
            }
            (Nesting::Top, b'{') => {
                nesting = Nesting::Brace;
                depth = 1;
            }
            (Nesting::Paren, b'(') | (Nesting::Bracket, b'[') | (Nesting::Brace, b'{') => {
                depth += 1;
            }
            (Nesting::Paren, b')') | (Nesting::Bracket, b']') | (Nesting::Brace, b'}') => {
                depth -= 1;
                if depth == 0 {
                    nesting = Nesting::Top;
                }
            }
            _ => {}
        }
    }

    BracketScan {
        len: limit,
        delimited: false,
    }
}

/// Length of the run of spaces and newlines at the start of the input, capped
/// at `limit`.
pub fn scan_whitespace(mut peek: impl FnMut(usize) -> u8, limit: usize) -> usize {
    (0..limit)
        .find(|&i| !matches!(peek(i), b' ' | b'\n'))
        .unwrap_or(limit)
}

/// Whether `bytes` is a non-empty run of ASCII letters.
#[must_use]
pub fn is_readable(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_alphabetic)
}
