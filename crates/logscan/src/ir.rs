//! Framing helpers for the IR stream boundary.
//!
//! Strings are framed as `[length class tag][big-endian length][bytes]` with
//! the smallest class that fits; metadata as
//! `[encoding tag][length class tag][big-endian length][JSON]`. Every helper
//! either appends a complete frame or leaves `out` as it was.

use alloc::vec::Vec;

use crate::{error::EncodeError, token::TokenView};

/// Tag bytes of the IR protocol.
pub mod protocol {
    pub mod metadata {
        pub const ENCODING_JSON: u8 = 0x01;
        pub const LENGTH_UBYTE: u8 = 0x11;
        pub const LENGTH_USHORT: u8 = 0x12;
    }

    pub mod payload {
        pub const STR_LEN_UBYTE: u8 = 0x41;
        pub const STR_LEN_USHORT: u8 = 0x42;
        pub const STR_LEN_UINT: u8 = 0x43;
    }
}

/// Largest string payload a frame can carry.
pub const MAX_STRING_LEN: usize = u32::MAX as usize;
/// Largest serialized metadata block a frame can carry.
pub const MAX_METADATA_LEN: usize = u16::MAX as usize;

fn push_string_header(len: usize, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    use protocol::payload::{STR_LEN_UBYTE, STR_LEN_UINT, STR_LEN_USHORT};

    if let Ok(len) = u8::try_from(len) {
        out.extend_from_slice(&[STR_LEN_UBYTE, len]);
    } else if let Ok(len) = u16::try_from(len) {
        out.push(STR_LEN_USHORT);
        out.extend_from_slice(&len.to_be_bytes());
    } else if let Ok(len) = u32::try_from(len) {
        out.push(STR_LEN_UINT);
        out.extend_from_slice(&len.to_be_bytes());
    } else {
        return Err(EncodeError::OversizedPayload {
            len,
            max: MAX_STRING_LEN,
        });
    }
    Ok(())
}

/// Appends one string frame.
///
/// # Errors
///
/// [`EncodeError::OversizedPayload`] when `bytes` is longer than
/// [`MAX_STRING_LEN`].
///
/// # Examples
///
/// ```rust
/// use logscan::ir::{encode_string, protocol::payload::STR_LEN_UBYTE};
///
/// let mut out = Vec::new();
/// encode_string(b"hello", &mut out).unwrap();
/// assert_eq!(out, [STR_LEN_UBYTE, 5, b'h', b'e', b'l', b'l', b'o']);
/// ```
pub fn encode_string(bytes: &[u8], out: &mut Vec<u8>) -> Result<(), EncodeError> {
    push_string_header(bytes.len(), out)?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Appends one string frame holding the token's bytes, copying the two wrap
/// segments directly.
///
/// # Errors
///
/// Same as [`encode_string`].
pub fn encode_token(view: &TokenView<'_>, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let (head, tail) = view.segments();
    push_string_header(head.len() + tail.len(), out)?;
    out.reserve(head.len() + tail.len());
    out.extend_from_slice(head);
    out.extend_from_slice(tail);
    Ok(())
}

/// Appends a JSON metadata frame.
///
/// # Errors
///
/// [`EncodeError::OversizedPayload`] when the serialized JSON is longer than
/// [`MAX_METADATA_LEN`], and [`EncodeError::Json`] when serialization fails.
pub fn encode_metadata(
    metadata: &serde_json::Value,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    use protocol::metadata::{ENCODING_JSON, LENGTH_UBYTE, LENGTH_USHORT};

    let json = serde_json::to_vec(metadata)?;
    let len = json.len();
    if let Ok(len) = u8::try_from(len) {
        out.extend_from_slice(&[ENCODING_JSON, LENGTH_UBYTE, len]);
    } else if let Ok(len) = u16::try_from(len) {
        out.extend_from_slice(&[ENCODING_JSON, LENGTH_USHORT]);
        out.extend_from_slice(&len.to_be_bytes());
    } else {
        tracing::debug!(len, "metadata too large for the IR stream");
        return Err(EncodeError::OversizedPayload {
            len,
            max: MAX_METADATA_LEN,
        });
    }
    out.extend_from_slice(&json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec};

    use rstest::rstest;
    use serde_json::json;

    use super::{protocol::payload::*, *};
    use crate::{scan_buffer::ScanBuffer, token::FieldTag};

    #[rstest]
    #[case::empty(0, &[STR_LEN_UBYTE, 0])]
    #[case::short(10, &[STR_LEN_UBYTE, 10])]
    #[case::ubyte_max(255, &[STR_LEN_UBYTE, 0xff])]
    #[case::ushort_min(256, &[STR_LEN_USHORT, 0x01, 0x00])]
    #[case::medium(300, &[STR_LEN_USHORT, 0x01, 0x2c])]
    #[case::uint_min(65_536, &[STR_LEN_UINT, 0x00, 0x01, 0x00, 0x00])]
    fn string_length_classes(#[case] len: usize, #[case] header: &[u8]) {
        let payload = vec![b'z'; len];
        let mut out = Vec::new();
        encode_string(&payload, &mut out).unwrap();
        assert_eq!(&out[..header.len()], header);
        assert_eq!(out.len(), header.len() + len);
        assert!(out[header.len()..].iter().all(|&b| b == b'z'));
    }

    #[test]
    fn token_frame_joins_wrap_segments() {
        let mut buf = ScanBuffer::with_inline_capacity(16);
        buf.append_range(b"0123456789abcdef").unwrap();
        let token = buf.span(12, 4, FieldTag::Variable);
        let view = buf.view(&token).unwrap();

        let mut out = vec![0xaa];
        encode_token(&view, &mut out).unwrap();
        assert_eq!(out, b"\xaa\x41\x08cdef0123");
    }

    #[test]
    fn metadata_frame() {
        let mut out = Vec::new();
        encode_metadata(&json!({"v": 1}), &mut out).unwrap();
        assert_eq!(out[..3], [0x01, 0x11, 7]);
        assert_eq!(&out[3..], br#"{"v":1}"#);

        let mut out = Vec::new();
        let long = String::from_utf8(vec![b'm'; 400]).unwrap();
        encode_metadata(&json!({ "k": long }), &mut out).unwrap();
        assert_eq!(out[..2], [0x01, 0x12]);
        assert_eq!(u16::from_be_bytes([out[2], out[3]]), 408);
        assert_eq!(out.len(), 4 + 408);
    }

    #[test]
    fn oversized_metadata_leaves_output_untouched() {
        let mut out = b"prefix".to_vec();
        let huge = String::from_utf8(vec![b'x'; MAX_METADATA_LEN]).unwrap();
        let err = encode_metadata(&json!({ "k": huge }), &mut out).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::OversizedPayload {
                max: MAX_METADATA_LEN,
                ..
            }
        ));
        assert_eq!(out, b"prefix");
    }
}
