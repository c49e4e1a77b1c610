//! Protocol module - wire format and framing.
//!
//! This module implements the transport-level binary protocol:
//! - 4-byte little-endian length-prefix encoding
//! - Frame decoder for accumulating partial reads
//! - Error response body encoding/decoding

mod frame_decoder;
mod wire_format;

pub use frame_decoder::FrameDecoder;
pub use wire_format::{
    build_frame, decode_error_body, encode_error_body, is_error_tag, read_length,
    DEFAULT_MAX_FRAME_SIZE, ERROR_TAG, ERROR_TAG_MIN, LEN_PREFIX_SIZE,
};
