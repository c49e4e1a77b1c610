//! Wire value primitives.
//!
//! Reading and writing the fixed-width values used inside payload bodies.
//! All multi-byte integers are little-endian; strings are u16-length-prefixed
//! UTF-8. Writers take any `BufMut`; readers take any `Buf` and return a
//! protocol error on underflow instead of panicking.

use bytes::{Buf, BufMut};

use crate::error::{Result, WirelineError};

fn need(buf: &impl Buf, n: usize, what: &str) -> Result<()> {
    if buf.remaining() < n {
        return Err(WirelineError::Protocol(format!(
            "Truncated {}: need {} bytes, have {}",
            what,
            n,
            buf.remaining()
        )));
    }
    Ok(())
}

/// Write a u8.
#[inline]
pub fn put_u8(buf: &mut impl BufMut, value: u8) {
    buf.put_u8(value);
}

/// Write a u16 (little-endian).
#[inline]
pub fn put_u16(buf: &mut impl BufMut, value: u16) {
    buf.put_u16_le(value);
}

/// Write a u32 (little-endian).
#[inline]
pub fn put_u32(buf: &mut impl BufMut, value: u32) {
    buf.put_u32_le(value);
}

/// Write a u64 (little-endian).
#[inline]
pub fn put_u64(buf: &mut impl BufMut, value: u64) {
    buf.put_u64_le(value);
}

/// Write an f64 (little-endian IEEE 754).
#[inline]
pub fn put_f64(buf: &mut impl BufMut, value: f64) {
    buf.put_f64_le(value);
}

/// Write a u16-length-prefixed UTF-8 string.
///
/// Strings longer than `u16::MAX` bytes are truncated at the length-field
/// limit.
pub fn put_str(buf: &mut impl BufMut, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    buf.put_u16_le(len as u16);
    buf.put_slice(&bytes[..len]);
}

/// Read a u8.
pub fn get_u8(buf: &mut impl Buf) -> Result<u8> {
    need(buf, 1, "u8")?;
    Ok(buf.get_u8())
}

/// Read a u16 (little-endian).
pub fn get_u16(buf: &mut impl Buf) -> Result<u16> {
    need(buf, 2, "u16")?;
    Ok(buf.get_u16_le())
}

/// Read a u32 (little-endian).
pub fn get_u32(buf: &mut impl Buf) -> Result<u32> {
    need(buf, 4, "u32")?;
    Ok(buf.get_u32_le())
}

/// Read a u64 (little-endian).
pub fn get_u64(buf: &mut impl Buf) -> Result<u64> {
    need(buf, 8, "u64")?;
    Ok(buf.get_u64_le())
}

/// Read an f64 (little-endian IEEE 754).
pub fn get_f64(buf: &mut impl Buf) -> Result<f64> {
    need(buf, 8, "f64")?;
    Ok(buf.get_f64_le())
}

/// Read a u16-length-prefixed UTF-8 string.
pub fn get_str(buf: &mut impl Buf) -> Result<String> {
    let len = get_u16(buf)? as usize;
    need(buf, len, "string body")?;
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    String::from_utf8(bytes)
        .map_err(|e| WirelineError::Protocol(format!("String is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn test_integer_roundtrip() {
        let mut buf = BytesMut::new();
        put_u8(&mut buf, 0x12);
        put_u16(&mut buf, 0x3456);
        put_u32(&mut buf, 0x789A_BCDE);
        put_u64(&mut buf, 0x0123_4567_89AB_CDEF);

        let mut body = Bytes::from(buf);
        assert_eq!(get_u8(&mut body).unwrap(), 0x12);
        assert_eq!(get_u16(&mut body).unwrap(), 0x3456);
        assert_eq!(get_u32(&mut body).unwrap(), 0x789A_BCDE);
        assert_eq!(get_u64(&mut body).unwrap(), 0x0123_4567_89AB_CDEF);
        assert!(!body.has_remaining());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = BytesMut::new();
        put_u32(&mut buf, 0x0102_0304);
        assert_eq!(&buf[..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_f64_roundtrip() {
        let mut buf = BytesMut::new();
        put_f64(&mut buf, -1234.5678);

        let mut body = Bytes::from(buf);
        assert_eq!(get_f64(&mut body).unwrap(), -1234.5678);
    }

    #[test]
    fn test_string_roundtrip() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "hello wire");

        let mut body = Bytes::from(buf);
        assert_eq!(get_str(&mut body).unwrap(), "hello wire");
    }

    #[test]
    fn test_empty_string() {
        let mut buf = BytesMut::new();
        put_str(&mut buf, "");

        let mut body = Bytes::from(buf);
        assert_eq!(get_str(&mut body).unwrap(), "");
    }

    #[test]
    fn test_underflow_is_protocol_error() {
        let mut body = Bytes::from_static(&[1, 2]);
        let result = get_u32(&mut body);
        assert!(matches!(result, Err(WirelineError::Protocol(_))));
    }

    #[test]
    fn test_string_truncated_body() {
        let mut buf = BytesMut::new();
        put_u16(&mut buf, 10);
        buf.put_slice(b"shrt");

        let mut body = Bytes::from(buf);
        assert!(get_str(&mut body).is_err());
    }

    #[test]
    fn test_string_invalid_utf8() {
        let mut buf = BytesMut::new();
        put_u16(&mut buf, 2);
        buf.put_slice(&[0xFF, 0xFE]);

        let mut body = Bytes::from(buf);
        assert!(get_str(&mut body).is_err());
    }
}
