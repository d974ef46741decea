//! StreamReader: half-at-a-time ingestion over a [`ScanBuffer`] ring.
//!
//! Overview
//! - Input lands in the ring one half-block at a time. The half being filled
//!   may only be written once everything it previously held lies before the
//!   commit point, so a refill can never clobber bytes a retry or an
//!   outstanding [`Token`] might still need. [`refill`](StreamReader::refill)
//!   and [`ingest`](StreamReader::ingest) check this themselves and fail with
//!   [`ReaderError::UnsafeRefill`] instead of overwriting.
//! - Positions are tracked as absolute stream offsets (`u64`) and mapped onto
//!   the ring modulo its capacity. This keeps the bookkeeping identical before
//!   and after the ring grows.
//! - `commit()` freezes the working position as the retry anchor and
//!   `rewind()` returns to it. A speculative parse that fails part-way leaves
//!   the commit point untouched, so the caller can rewind and try again once
//!   more input (or a different strategy) is available.
//!
//! Counters (all absolute, monotonically related)
//! `committed <= consumed <= cursor <= read_cursor`, except that `next_byte`
//! advances `cursor` alone.

use alloc::boxed::Box;
use core::fmt;
use std::io::{self, Read};

use crate::{
    error::{ReaderError, ScanError},
    options::ReaderOptions,
    scan::{self, BracketScan, ByteClass},
    scan_buffer::ScanBuffer,
    token::{FieldTag, Token, TokenView},
};

/// Callback receiving every byte range passed over by [`StreamReader::skip`]
/// right before it is skipped.
pub type SkipObserver = Box<dyn FnMut(TokenView<'_>)>;

/// One half of the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    /// Slots `0..capacity / 2`.
    First,
    /// Slots `capacity / 2..capacity`.
    Second,
}

/// Result of [`StreamReader::next_byte`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextByte {
    /// The byte at the working position.
    Byte(u8),
    /// Everything ingested so far has been read, but more input may follow.
    Pending,
    /// Input is closed and fully read.
    Eof,
}

/// Pull-based reader over a [`ScanBuffer`] ring, with commit and rewind for
/// speculative parsing.
pub struct StreamReader {
    storage: ScanBuffer,

    // Absolute stream offsets.
    read_cursor: u64,
    cursor: u64,
    consumed: u64,
    committed: u64,

    last_half_read: Option<Half>,
    end_of_input: bool,
    fully_consumed: bool,
    bytes_scanned: u64,

    skip_observer: Option<SkipObserver>,
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("storage", &self.storage)
            .field("read_cursor", &self.read_cursor)
            .field("cursor", &self.cursor)
            .field("consumed", &self.consumed)
            .field("committed", &self.committed)
            .field("last_half_read", &self.last_half_read)
            .field("end_of_input", &self.end_of_input)
            .field("fully_consumed", &self.fully_consumed)
            .field("skip_observer", &self.skip_observer.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for StreamReader {
    fn default() -> Self {
        Self::new(ReaderOptions::default())
    }
}

impl StreamReader {
    /// Creates an empty reader; nothing is ingested until the first refill.
    #[must_use]
    pub fn new(options: ReaderOptions) -> Self {
        Self {
            storage: ScanBuffer::with_inline_capacity(options.inline_capacity),
            read_cursor: 0,
            cursor: 0,
            consumed: 0,
            committed: 0,
            last_half_read: None,
            end_of_input: false,
            fully_consumed: false,
            bytes_scanned: 0,
            skip_observer: None,
        }
    }

    /// Prepares the reader for an unrelated input: releases grown blocks,
    /// zeroes every counter and drops the skip observer. Tokens issued before
    /// the reset become stale.
    pub fn reset(&mut self) {
        self.storage.reset();
        self.read_cursor = 0;
        self.cursor = 0;
        self.consumed = 0;
        self.committed = 0;
        self.last_half_read = None;
        self.end_of_input = false;
        self.fully_consumed = false;
        self.bytes_scanned = 0;
        self.skip_observer = None;
    }

    #[inline]
    fn capacity64(&self) -> u64 {
        self.storage.capacity() as u64
    }

    #[inline]
    #[expect(clippy::cast_possible_truncation)]
    fn slot(&self, abs: u64) -> usize {
        (abs % self.capacity64()) as usize
    }

    fn half_of(&self, slot: usize) -> Half {
        if slot < self.storage.capacity() / 2 {
            Half::First
        } else {
            Half::Second
        }
    }

    /// The absolute range of the half-block the next refill writes into.
    fn fill_window(&self) -> (u64, u64) {
        let half = self.capacity64() / 2;
        let start = self.read_cursor - self.read_cursor % half;
        (start, start + half)
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// The underlying ring.
    #[must_use]
    pub fn buffer(&self) -> &ScanBuffer {
        &self.storage
    }

    /// Capacity of the active block.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Total bytes ingested since the last reset.
    #[must_use]
    pub fn read_cursor(&self) -> u64 {
        self.read_cursor
    }

    /// Absolute working position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Absolute offset up to which reads and skips have consumed the input.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Absolute offset of the retry anchor.
    #[must_use]
    pub fn commit_point(&self) -> u64 {
        self.committed
    }

    /// The half the latest refill wrote into.
    #[must_use]
    pub fn last_half_read(&self) -> Option<Half> {
        self.last_half_read
    }

    /// Whether the source is exhausted or input was closed explicitly.
    #[must_use]
    pub fn end_of_input(&self) -> bool {
        self.end_of_input
    }

    /// Whether [`next_byte`](Self::next_byte) has reported [`NextByte::Eof`].
    #[must_use]
    pub fn is_fully_consumed(&self) -> bool {
        self.fully_consumed
    }

    /// Whether the working position has caught up with the ingested input.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.cursor == self.read_cursor
    }

    /// Ingested bytes not yet passed by the working position.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn available(&self) -> usize {
        (self.read_cursor - self.cursor) as usize
    }

    /// Bytes inspected by delimiter searches since the last reset.
    #[must_use]
    pub fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned
    }

    /// Registers a callback run by [`skip`](Self::skip) before each skip.
    pub fn set_skip_observer(&mut self, observer: impl FnMut(TokenView<'_>) + 'static) {
        self.skip_observer = Some(Box::new(observer));
    }

    pub fn clear_skip_observer(&mut self) {
        self.skip_observer = None;
    }

    // ---------------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------------

    /// Whether the half-block the next refill writes into only holds data
    /// that lies before the commit point.
    #[must_use]
    pub fn read_is_safe(&self) -> bool {
        !self.end_of_input && self.fill_window().1 <= self.committed + self.capacity64()
    }

    fn check_refill(&self) -> Result<(), ReaderError> {
        if self.end_of_input {
            return Err(ReaderError::InputClosed);
        }
        if !self.read_is_safe() {
            return Err(ReaderError::UnsafeRefill {
                read_cursor: self.read_cursor,
                committed: self.committed,
            });
        }
        Ok(())
    }

    /// Copies as much of `bytes` as fits into the current half-block and
    /// returns how many bytes were taken.
    ///
    /// # Errors
    ///
    /// Fails with [`ReaderError::UnsafeRefill`] when the half still holds data
    /// at or after the commit point, and with [`ReaderError::InputClosed`]
    /// after end of input.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<usize, ReaderError> {
        self.check_refill()?;
        let (_, window_end) = self.fill_window();
        #[expect(clippy::cast_possible_truncation)]
        let room = (window_end - self.read_cursor) as usize;
        let n = bytes.len().min(room);
        if n == 0 {
            return Ok(0);
        }

        let at = self.slot(self.read_cursor);
        self.storage.write_at(at, &bytes[..n])?;
        self.read_cursor += n as u64;
        self.last_half_read = Some(self.half_of(at));
        Ok(n)
    }

    /// Fills the current half-block from `source`. A zero-length read marks
    /// the end of input.
    ///
    /// # Errors
    ///
    /// Same as [`ingest`](Self::ingest), plus any I/O error other than
    /// [`io::ErrorKind::Interrupted`].
    pub fn refill<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<usize, ReaderError> {
        self.check_refill()?;
        let (window_start, window_end) = self.fill_window();
        let mut filled = 0usize;

        while self.read_cursor < window_end {
            let at = self.slot(self.read_cursor);
            #[expect(clippy::cast_possible_truncation)]
            let room = (window_end - self.read_cursor) as usize;
            match source.read(self.storage.region_mut(at, room)) {
                Ok(0) => {
                    self.end_of_input = true;
                    break;
                }
                Ok(n) => {
                    self.read_cursor += n as u64;
                    filled += n;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }

        if filled > 0 {
            let slot = self.slot(window_start);
            self.last_half_read = Some(self.half_of(slot));
        }
        tracing::trace!(
            filled,
            read_cursor = self.read_cursor,
            end_of_input = self.end_of_input,
            "refilled reader"
        );
        Ok(filled)
    }

    /// Marks the end of input. Nothing can be ingested afterwards.
    pub fn finish_input(&mut self) {
        self.end_of_input = true;
    }

    /// Doubles the ring, carrying the live bytes (commit point to read cursor)
    /// over to their positions in the new block. Returns the new capacity.
    ///
    /// Tokens issued before the call keep pointing into the previous block,
    /// which stays alive until [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Fails with [`ScanError::ResourceExhausted`] when the block cannot be
    /// allocated.
    pub fn grow(&mut self) -> Result<usize, ReaderError> {
        let old_capacity = self.storage.capacity();
        let capacity = self.storage.grow()?;
        let (live_start, live_end) = (self.committed, self.read_cursor);

        if let Some((old, new)) = self.storage.last_two_blocks() {
            let mut abs = live_start;
            while abs < live_end {
                #[expect(clippy::cast_possible_truncation)]
                let (from, to, left) = (
                    (abs % old_capacity as u64) as usize,
                    (abs % capacity as u64) as usize,
                    (live_end - abs) as usize,
                );
                let run = left.min(old_capacity - from).min(capacity - to);
                new[to..to + run].copy_from_slice(&old[from..from + run]);
                abs += run as u64;
            }
        }

        let slot = self.slot(self.cursor);
        self.storage.set_position(slot);
        Ok(capacity)
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    /// The next unread byte, advancing past it.
    ///
    /// [`NextByte::Eof`] is returned only once input is closed and every
    /// ingested byte has been read, and keeps being returned after that.
    pub fn next_byte(&mut self) -> NextByte {
        if self.is_drained() {
            if self.end_of_input {
                self.fully_consumed = true;
                return NextByte::Eof;
            }
            return NextByte::Pending;
        }
        let byte = self.storage.peek(0);
        self.storage.advance(1);
        self.cursor += 1;
        NextByte::Byte(byte)
    }

    /// The byte `offset` positions ahead, if it has been ingested.
    #[must_use]
    pub fn peek(&self, offset: usize) -> Option<u8> {
        (offset < self.available()).then(|| self.storage.peek(offset))
    }

    /// Scans a bracket-aware token over at most `limit` ingested bytes without
    /// consuming anything.
    #[must_use]
    pub fn scan_bracket_aware(&self, limit: usize) -> BracketScan {
        scan::scan_bracket_aware(|i| self.storage.peek(i), limit.min(self.available()))
    }

    fn span(&self, len: usize, tag: FieldTag) -> Result<Token, ReaderError> {
        let available = self.available();
        if len > available {
            return Err(ReaderError::Starved {
                requested: len,
                available,
            });
        }
        let capacity = self.storage.capacity();
        if len >= capacity {
            return Err(ReaderError::SpanTooLong { len, capacity });
        }
        let start = self.slot(self.cursor);
        let end = self.slot(self.cursor + len as u64);
        let mut token = self.storage.span(start, end, tag);
        token.stream_offset = self.cursor;
        Ok(token)
    }

    fn consume(&mut self, len: usize) {
        self.storage.advance(len);
        self.cursor += len as u64;
        self.consumed = self.cursor;
    }

    /// Reads exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Starved`] when fewer than `n` bytes are buffered.
    pub fn read_fixed(&mut self, n: usize) -> Result<Token, ReaderError> {
        let token = self.span(n, FieldTag::Variable)?;
        self.consume(n);
        Ok(token)
    }

    /// Reads a bracket-aware token, stopping before the terminating space or
    /// newline.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Starved`] when the token may continue past the buffered
    /// input and input is still open.
    pub fn read_token(&mut self) -> Result<Token, ReaderError> {
        let available = self.available();
        let scanned = self.scan_bracket_aware(available);
        if !scanned.delimited && !self.end_of_input {
            return Err(ReaderError::Starved {
                requested: available + 1,
                available,
            });
        }
        self.read_fixed(scanned.len)
    }

    /// Reads a run of ASCII letters.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Starved`] when the run reaches the end of the buffered
    /// input and input is still open.
    pub fn read_alphabetic(&mut self) -> Result<Token, ReaderError> {
        let available = self.available();
        let len = (0..available)
            .find(|&i| !self.storage.peek(i).is_ascii_alphabetic())
            .unwrap_or(available);
        if len == available && !self.end_of_input {
            return Err(ReaderError::Starved {
                requested: available + 1,
                available,
            });
        }
        self.read_fixed(len)
    }

    fn read_until(&mut self, class: ByteClass) -> Result<Token, ReaderError> {
        let available = self.available();
        match self.storage.find_within(class, available) {
            Some(len) => {
                self.bytes_scanned += len as u64;
                self.read_fixed(len)
            }
            None if self.end_of_input => {
                self.bytes_scanned += available as u64;
                self.read_fixed(available)
            }
            None => Err(ReaderError::Undelimited { available }),
        }
    }

    /// Reads up to (not including) the next space. At end of input the rest
    /// of the input is returned.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Undelimited`] when no space is buffered and input is
    /// still open.
    pub fn read_until_space(&mut self) -> Result<Token, ReaderError> {
        self.read_until(ByteClass::SPACE)
    }

    /// Reads up to (not including) the next newline. At end of input the rest
    /// of the input is returned.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Undelimited`] when no newline is buffered and input is
    /// still open.
    pub fn read_until_newline(&mut self) -> Result<Token, ReaderError> {
        self.read_until(ByteClass::NEWLINE)
    }

    /// Skips `n` bytes, handing them to the skip observer first.
    ///
    /// # Errors
    ///
    /// [`ReaderError::Starved`] when fewer than `n` bytes are buffered.
    pub fn skip(&mut self, n: usize) -> Result<(), ReaderError> {
        let token = self.span(n, FieldTag::Delimiter)?;
        if let Some(observer) = self.skip_observer.as_mut() {
            observer(self.storage.view(&token)?);
        }
        self.consume(n);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Speculation
    // ---------------------------------------------------------------------

    /// Freezes the working position as the retry anchor. Everything before it
    /// may be overwritten by later refills.
    pub fn commit(&mut self) {
        self.committed = self.cursor;
        self.consumed = self.cursor;
    }

    /// Returns to the retry anchor, discarding uncommitted progress.
    pub fn rewind(&mut self) {
        self.cursor = self.committed;
        self.consumed = self.committed;
        self.fully_consumed = false;
        let slot = self.slot(self.committed);
        self.storage.set_position(slot);
    }

    /// Resolves a token issued by this reader.
    ///
    /// # Errors
    ///
    /// [`ScanError::StaleToken`] when the reader was reset since the token was
    /// issued, or when a later refill has overwritten its bytes.
    pub fn view(&self, token: &Token) -> Result<TokenView<'_>, ReaderError> {
        let view = self.storage.view(token)?;
        if token.block == self.storage.active_block() {
            let oldest_intact = self.read_cursor.saturating_sub(self.capacity64());
            if token.stream_offset < oldest_intact {
                return Err(ScanError::StaleToken.into());
            }
        }
        Ok(view)
    }
}
