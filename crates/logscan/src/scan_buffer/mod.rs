//! ScanBuffer: a growable ring of bytes that never moves issued data.
//!
//! Storage is a list of blocks. The first block is the base block: it is
//! allocated once and kept for the lifetime of the buffer. `grow()` appends a
//! block of twice the active capacity and makes it active; earlier blocks are
//! kept alive untouched, so spans issued against them stay readable. `reset()`
//! is the only reclamation point: it drops every grown block, returns to the
//! base block and bumps the generation, which invalidates every outstanding
//! [`Token`].
//!
//! Invariants
//! - `position < capacity()` after every public operation.
//! - Blocks other than the active one are never written.
//! - `generation` changes exactly when grown blocks are released.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

use crate::{
    error::ScanError,
    scan::{ByteClass, SCAN_CHUNK},
    token::{FieldTag, Token, TokenView},
};

/// Default size of the base block in bytes.
pub const DEFAULT_INLINE_CAPACITY: usize = 60_000;

/// A ring of bytes over a base block plus any grown blocks.
pub struct ScanBuffer {
    blocks: Vec<Box<[u8]>>,
    position: usize,
    generation: u64,
}

impl fmt::Debug for ScanBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanBuffer")
            .field("capacity", &self.capacity())
            .field("position", &self.position)
            .field("blocks", &self.blocks.len())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanBuffer {
    /// Creates a buffer with a [`DEFAULT_INLINE_CAPACITY`] base block.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inline_capacity(DEFAULT_INLINE_CAPACITY)
    }

    /// Creates a buffer whose base block holds `capacity` bytes, rounded up to
    /// an even number (the reader fills the ring half a block at a time) and
    /// to at least two.
    #[must_use]
    pub fn with_inline_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_multiple_of(2);
        Self {
            blocks: alloc::vec![alloc::vec![0u8; capacity].into_boxed_slice()],
            position: 0,
            generation: 0,
        }
    }

    #[inline]
    fn active(&self) -> &[u8] {
        // The base block is never removed, so `blocks` is never empty.
        &self.blocks[self.blocks.len() - 1]
    }

    #[inline]
    fn active_mut(&mut self) -> &mut [u8] {
        let last = self.blocks.len() - 1;
        &mut self.blocks[last]
    }

    /// Capacity of the active block.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.active().len()
    }

    /// Capacity of the base block, which is what `reset()` returns to.
    #[must_use]
    pub fn inline_capacity(&self) -> usize {
        self.blocks[0].len()
    }

    /// Write and scan position within the active block.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of live blocks, the base block included.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Bumped by every reset; tokens from an older generation are stale.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    fn wrap(&self, pos: usize) -> usize {
        let capacity = self.capacity();
        if pos >= capacity { pos % capacity } else { pos }
    }

    /// Writes `item` at the current position and advances past it.
    pub fn append(&mut self, item: u8) {
        let pos = self.position;
        self.active_mut()[pos] = item;
        self.advance(1);
    }

    /// Writes `items` starting at the current position, wrapping at the end of
    /// the block, and advances past them.
    ///
    /// # Errors
    ///
    /// Fails without writing when `items` is longer than the block; the buffer
    /// never reallocates on its own, call [`grow`](Self::grow) first.
    pub fn append_range(&mut self, items: &[u8]) -> Result<(), ScanError> {
        self.write_at(self.position, items)?;
        self.advance(items.len());
        Ok(())
    }

    /// Writes `items` at `pos` (wrapping) without moving the position.
    pub(crate) fn write_at(&mut self, pos: usize, items: &[u8]) -> Result<(), ScanError> {
        let capacity = self.capacity();
        if items.len() > capacity {
            return Err(ScanError::InsufficientCapacity {
                requested: items.len(),
                capacity,
            });
        }
        let pos = self.wrap(pos);
        let head = items.len().min(capacity - pos);
        let storage = self.active_mut();
        storage[pos..pos + head].copy_from_slice(&items[..head]);
        storage[..items.len() - head].copy_from_slice(&items[head..]);
        Ok(())
    }

    /// Mutable access to `len` contiguous bytes of the active block starting at
    /// `pos`, used to read input straight into the ring.
    pub(crate) fn region_mut(&mut self, pos: usize, len: usize) -> &mut [u8] {
        &mut self.active_mut()[pos..pos + len]
    }

    /// The byte `offset` positions after the current position, wrapping at the
    /// end of the block.
    #[must_use]
    pub fn peek(&self, offset: usize) -> u8 {
        self.active()[self.wrap(self.position + offset)]
    }

    /// Moves the position forward by `offset`, wrapping at the end of the
    /// block.
    pub fn advance(&mut self, offset: usize) {
        self.position = self.wrap(self.position + offset);
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = self.wrap(position);
    }

    /// Offset from the current position of the first byte of `class`, looking
    /// at most one full lap around the block.
    #[must_use]
    pub fn find(&self, class: ByteClass) -> Option<usize> {
        self.find_within(class, self.capacity())
    }

    /// Offset from the current position of the first byte of `class` among the
    /// next `limit` bytes.
    ///
    /// The block is searched in chunks of [`SCAN_CHUNK`] bytes. A chunk that
    /// would cross the end of the block is cut at the wrap point and the
    /// remainder of the chunk is filled with the class's pad byte, which can
    /// never match; the search then continues at offset zero of the block.
    #[must_use]
    pub fn find_within(&self, class: ByteClass, limit: usize) -> Option<usize> {
        let storage = self.active();
        let capacity = storage.len();
        let limit = limit.min(capacity);

        let mut scratch = [class.pad_byte(); SCAN_CHUNK];
        let mut pos = self.position;
        let mut offset = 0;

        while offset < limit {
            let (chunk, width) = if pos + SCAN_CHUNK <= capacity {
                (&storage[pos..pos + SCAN_CHUNK], SCAN_CHUNK)
            } else {
                let width = capacity - pos;
                scratch[..width].copy_from_slice(&storage[pos..]);
                scratch[width..].fill(class.pad_byte());
                (&scratch[..], width)
            };

            if let Some(hit) = class.find_in(chunk) {
                debug_assert!(hit < width, "pad byte matched {class:?}");
                let found = offset + hit;
                return (found < limit).then_some(found);
            }

            offset += width;
            pos += width;
            if pos == capacity {
                pos = 0;
            }
        }
        None
    }

    /// Switches to a new block of twice the active capacity and returns the
    /// new capacity.
    ///
    /// The old block stays allocated and unchanged until [`reset`](Self::reset),
    /// so tokens issued before the call stay valid. The new block starts zeroed;
    /// copying live data over is up to the caller.
    ///
    /// # Errors
    ///
    /// Fails with [`ScanError::ResourceExhausted`] when the block cannot be
    /// allocated.
    pub fn grow(&mut self) -> Result<usize, ScanError> {
        let requested = self
            .capacity()
            .checked_mul(2)
            .ok_or(ScanError::ResourceExhausted {
                requested: usize::MAX,
            })?;

        let mut block = Vec::new();
        if block.try_reserve_exact(requested).is_err() {
            tracing::error!(requested, "failed to allocate scan buffer block");
            return Err(ScanError::ResourceExhausted { requested });
        }
        block.resize(requested, 0);
        self.blocks.push(block.into_boxed_slice());

        tracing::debug!(
            capacity = requested,
            blocks = self.blocks.len(),
            "grew scan buffer"
        );
        Ok(requested)
    }

    /// The previous active block and the new one, right after a `grow()`.
    pub(crate) fn last_two_blocks(&mut self) -> Option<(&[u8], &mut [u8])> {
        let n = self.blocks.len();
        if n < 2 {
            return None;
        }
        let (older, newest) = self.blocks.split_at_mut(n - 1);
        Some((&older[n - 2], &mut newest[0]))
    }

    /// Releases every grown block and returns to the base block at position
    /// zero. Outstanding tokens become stale.
    pub fn reset(&mut self) {
        if self.blocks.len() > 1 {
            tracing::debug!(released = self.blocks.len() - 1, "releasing grown blocks");
        }
        self.blocks.truncate(1);
        self.position = 0;
        self.generation += 1;
    }

    /// Issues a token for `[start, end)` of the active block.
    ///
    /// `start == end` denotes an empty span; `start > end` a wrapping one.
    #[must_use]
    pub fn span(&self, start: usize, end: usize, tag: FieldTag) -> Token {
        let capacity = self.capacity();
        debug_assert!(start < capacity && end < capacity);
        Token {
            block: self.blocks.len() - 1,
            generation: self.generation,
            capacity,
            start,
            end,
            stream_offset: start as u64,
            tag,
        }
    }

    #[inline]
    pub(crate) fn active_block(&self) -> usize {
        self.blocks.len() - 1
    }

    /// Resolves a token against the storage it was issued from.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::StaleToken`] for tokens issued before the last
    /// `reset()`.
    pub fn view(&self, token: &Token) -> Result<TokenView<'_>, ScanError> {
        if token.generation != self.generation {
            return Err(ScanError::StaleToken);
        }
        match self.blocks.get(token.block) {
            Some(block) if block.len() == token.capacity => Ok(TokenView::new(*token, block)),
            _ => Err(ScanError::StaleToken),
        }
    }
}

#[cfg(test)]
mod tests;
