//! Low-level backend framing primitives.
//!
//! Backend messages are a tag byte followed by a big-endian u32 length that
//! counts itself plus the payload, but not the tag. String fields are
//! null-terminated.

use bytes::{BufMut, BytesMut};

/// Frame a backend message: tag, length, payload.
pub fn frame(tag: u8, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(1 + 4 + payload.len());
    buf.put_u8(tag);
    buf.put_u32((4 + payload.len()) as u32);
    buf.extend_from_slice(payload);
    buf
}

/// Append a null-terminated string.
pub fn put_cstr(dst: &mut BytesMut, s: &str) {
    dst.extend_from_slice(s.as_bytes());
    dst.put_u8(0);
}
