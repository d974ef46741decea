use alloc::vec::Vec;

use quickcheck_macros::quickcheck;

use super::*;

fn filled(capacity: usize, data: &[u8]) -> ScanBuffer {
    let mut buf = ScanBuffer::with_inline_capacity(capacity);
    buf.append_range(data).unwrap();
    buf.set_position(0);
    buf
}

#[test]
fn capacity_is_rounded_to_even() {
    assert_eq!(ScanBuffer::with_inline_capacity(15).capacity(), 16);
    assert_eq!(ScanBuffer::with_inline_capacity(0).capacity(), 2);
    assert_eq!(ScanBuffer::new().capacity(), DEFAULT_INLINE_CAPACITY);
}

#[test]
fn append_wraps_position() {
    let mut buf = ScanBuffer::with_inline_capacity(4);
    buf.append_range(b"abc").unwrap();
    assert_eq!(buf.position(), 3);
    buf.append(b'd');
    assert_eq!(buf.position(), 0);
    buf.append_range(b"xy").unwrap();
    assert_eq!(buf.position(), 2);
    assert_eq!((0..4).map(|i| buf.peek(i)).collect::<Vec<_>>(), b"cdxy");
}

#[test]
fn append_range_refuses_to_overflow() {
    let mut buf = ScanBuffer::with_inline_capacity(4);
    assert_eq!(
        buf.append_range(b"abcde"),
        Err(ScanError::InsufficientCapacity {
            requested: 5,
            capacity: 4
        })
    );
    assert_eq!(buf.position(), 0);
}

#[test]
fn peek_and_advance_wrap() {
    let mut buf = filled(8, b"01234567");
    buf.advance(6);
    assert_eq!(buf.peek(0), b'6');
    assert_eq!(buf.peek(3), b'1');
    buf.advance(5);
    assert_eq!(buf.position(), 3);
}

#[test]
fn find_from_position() {
    let mut buf = filled(64, b"hello world\nbye");
    assert_eq!(buf.find(ByteClass::SPACE), Some(5));
    assert_eq!(buf.find(ByteClass::NEWLINE), Some(11));
    buf.advance(6);
    assert_eq!(buf.find(ByteClass::WHITESPACE), Some(5));
    assert_eq!(buf.find_within(ByteClass::NEWLINE, 5), None);
}

#[test]
fn find_spans_multiple_chunks() {
    let mut data = alloc::vec![b'a'; 100];
    data[77] = b'\n';
    let buf = filled(128, &data);
    assert_eq!(buf.find(ByteClass::NEWLINE), Some(77));
}

#[test]
fn find_wraps_around() {
    // Data runs from 60 through the end of the block and continues at 0.
    let mut buf = ScanBuffer::with_inline_capacity(64);
    buf.set_position(60);
    buf.append_range(b"abcdef ").unwrap();
    buf.set_position(60);
    assert_eq!(buf.find(ByteClass::SPACE), Some(6));
}

#[test]
fn padding_never_matches() {
    // Genuine data ends exactly at capacity - k, with k smaller than one
    // chunk; no delimiter anywhere in the region handed to the search.
    const CAP: usize = 64;
    for k in 1..SCAN_CHUNK {
        for class in [ByteClass::SPACE, ByteClass::new(b"0"), ByteClass::new(&[0])] {
            let mut buf = ScanBuffer::with_inline_capacity(CAP);
            // Fill with a byte that is not in any of the classes, then place a
            // member right after the wrap point.
            buf.append_range(&[b'x'; CAP]).unwrap();
            buf.set_position(0);
            buf.append(class.bytes()[0]);
            buf.set_position(CAP - k);
            assert_eq!(buf.find_within(class, k), None, "k={k} class={class:?}");
            assert_eq!(buf.find(class), Some(k), "k={k} class={class:?}");
        }
    }
}

#[test]
fn grow_keeps_old_views() {
    let mut buf = ScanBuffer::with_inline_capacity(8);
    buf.append_range(b"abcdefg").unwrap();
    let early = buf.span(1, 4, FieldTag::Variable);

    assert_eq!(buf.grow(), Ok(16));
    assert_eq!(buf.capacity(), 16);
    assert_eq!(buf.block_count(), 2);
    buf.set_position(0);
    buf.append_range(b"ZZZZZZZZZZZZZZZZ").unwrap();

    assert_eq!(buf.view(&early).unwrap(), "bcd");
    let late = buf.span(0, 3, FieldTag::Variable);
    assert_eq!(buf.view(&late).unwrap(), "ZZZ");
}

#[test]
fn reset_returns_to_base_block() {
    let mut buf = ScanBuffer::with_inline_capacity(8);
    let early = buf.span(0, 2, FieldTag::Metadata);
    buf.grow().unwrap();
    buf.grow().unwrap();
    buf.advance(20);
    assert_eq!(buf.capacity(), 32);

    buf.reset();
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.inline_capacity(), 8);
    assert_eq!(buf.position(), 0);
    assert_eq!(buf.block_count(), 1);
    assert_eq!(buf.view(&early).unwrap_err(), ScanError::StaleToken);

    buf.reset();
    assert_eq!(buf.capacity(), 8);
    assert_eq!(buf.position(), 0);
}

#[test]
fn last_two_blocks_after_grow() {
    let mut buf = ScanBuffer::with_inline_capacity(4);
    assert!(buf.last_two_blocks().is_none());
    buf.append_range(b"wxyz").unwrap();
    buf.grow().unwrap();
    let (old, new) = buf.last_two_blocks().unwrap();
    assert_eq!(old, b"wxyz");
    assert_eq!(new.len(), 8);
}

/// Writes that fit the current capacity read back unchanged, before and after
/// an intervening `grow()`.
#[quickcheck]
fn growth_preserves_written_bytes(data: Vec<u8>, grow_at: usize) -> bool {
    let mut buf = ScanBuffer::with_inline_capacity(32);
    let data = &data[..data.len().min(32)];
    let split = if data.is_empty() { 0 } else { grow_at % data.len() };

    buf.append_range(&data[..split]).unwrap();
    let before = buf.span(0, buf.position(), FieldTag::Variable);
    let before_ok = buf.view(&before).unwrap() == data[..split];

    buf.grow().unwrap();
    buf.set_position(split);
    buf.append_range(&data[split..]).unwrap();
    let after = buf.span(split, buf.position(), FieldTag::Variable);

    before_ok
        && buf.view(&before).unwrap() == data[..split]
        && buf.view(&after).unwrap() == data[split..]
}

#[quickcheck]
fn reset_is_idempotent(grows: u8, advance: usize) -> bool {
    let mut buf = ScanBuffer::with_inline_capacity(16);
    for _ in 0..grows % 6 {
        buf.grow().unwrap();
    }
    buf.advance(advance % 1024);
    buf.reset();
    buf.capacity() == 16 && buf.position() == 0 && buf.block_count() == 1
}
