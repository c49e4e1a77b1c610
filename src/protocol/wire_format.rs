//! Wire format encoding and decoding.
//!
//! Implements the length-prefixed frame format:
//! ```text
//! ┌───────────┬──────────────────┐
//! │ Length    │ Payload          │
//! │ 4 bytes   │ Length bytes     │
//! │ uint32 LE │                  │
//! └───────────┴──────────────────┘
//! ```
//!
//! `Length` counts only the payload, never the prefix itself. The payload
//! begins with a one-byte operation tag followed by an opaque body:
//! ```text
//! Payload := OpTag:u8 | Body:bytes
//! ```
//!
//! Tags in `0xF0..=0xFF` are reserved for error responses. An error body is
//! `ErrorCode:u8 | MessageLen:u16 LE | Message:UTF-8`.

use crate::error::{Result, WirelineError};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LEN_PREFIX_SIZE: usize = 4;

/// Default maximum frame payload size (16 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// First tag value of the reserved error-response range.
pub const ERROR_TAG_MIN: u8 = 0xF0;

/// Standard error response tag.
pub const ERROR_TAG: u8 = 0xF0;

/// Check whether an operation tag marks an error response.
#[inline]
pub fn is_error_tag(tag: u8) -> bool {
    tag >= ERROR_TAG_MIN
}

/// Read the 4-byte little-endian length prefix from the start of `buf`.
///
/// Returns `None` if the buffer holds fewer than 4 bytes.
#[inline]
pub fn read_length(buf: &[u8]) -> Option<u32> {
    if buf.len() < LEN_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

/// Build a complete wire frame for the given payload.
///
/// Prepends the little-endian length prefix and copies the payload into a
/// contiguous buffer, ready for a single write.
///
/// # Example
///
/// ```
/// use wireline::protocol::{build_frame, LEN_PREFIX_SIZE};
///
/// let frame = build_frame(b"\x01hello");
/// assert_eq!(frame.len(), LEN_PREFIX_SIZE + 6);
/// assert_eq!(&frame[..4], &6u32.to_le_bytes());
/// ```
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(LEN_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Encode an error body (`ErrorCode | MessageLen | Message`).
///
/// The tag byte is not included; callers prepend [`ERROR_TAG`] when building
/// a full error response payload. Messages longer than `u16::MAX` bytes are
/// truncated at the length-field limit.
pub fn encode_error_body(code: u8, message: &str) -> Vec<u8> {
    let msg = message.as_bytes();
    let len = msg.len().min(u16::MAX as usize);
    let mut buf = Vec::with_capacity(3 + len);
    buf.push(code);
    buf.extend_from_slice(&(len as u16).to_le_bytes());
    buf.extend_from_slice(&msg[..len]);
    buf
}

/// Decode an error body (tag byte already stripped).
///
/// Returns the error code and the message verbatim.
///
/// # Errors
///
/// Returns [`WirelineError::Protocol`] if the body is truncated or the
/// message is not valid UTF-8.
pub fn decode_error_body(body: &[u8]) -> Result<(u8, String)> {
    if body.len() < 3 {
        return Err(WirelineError::Protocol(format!(
            "Error body too short: {} bytes",
            body.len()
        )));
    }
    let code = body[0];
    let len = u16::from_le_bytes([body[1], body[2]]) as usize;
    let rest = &body[3..];
    if rest.len() < len {
        return Err(WirelineError::Protocol(format!(
            "Error message truncated: declared {} bytes, got {}",
            len,
            rest.len()
        )));
    }
    let message = std::str::from_utf8(&rest[..len])
        .map_err(|e| WirelineError::Protocol(format!("Error message is not UTF-8: {}", e)))?
        .to_string();
    Ok((code, message))
}
