//! Frame decoder for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForLength`: need at least 4 bytes of length prefix
//! - `WaitingForPayload`: prefix parsed, need N more payload bytes
//! - `Poisoned`: a fatal decode error occurred; inert until `reset`
//!
//! # Example
//!
//! ```
//! use wireline::protocol::{build_frame, FrameDecoder};
//!
//! let mut decoder = FrameDecoder::new();
//!
//! // Data arrives in arbitrary chunks from the socket
//! let payloads = decoder.push(&build_frame(b"\x01hello")).unwrap();
//! assert_eq!(&payloads[0][..], b"\x01hello");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{read_length, DEFAULT_MAX_FRAME_SIZE, LEN_PREFIX_SIZE};
use crate::error::{Result, WirelineError};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete length prefix (need 4 bytes).
    WaitingForLength,
    /// Prefix parsed, waiting for payload bytes.
    WaitingForPayload { remaining: u32 },
    /// A fatal decode error was reported; input is discarded until `reset`.
    Poisoned,
}

/// Buffer for accumulating incoming bytes and extracting complete frame
/// payloads.
///
/// This is a persistent push-parser: partial frames survive across `push`
/// calls, and a single call drains every complete frame already buffered.
/// All data is stored in a single `BytesMut` to minimize allocations;
/// extracted payloads are zero-copy `Bytes` views.
pub struct FrameDecoder {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed payload size.
    max_frame_size: u32,
}

impl FrameDecoder {
    /// Create a new frame decoder with default settings.
    ///
    /// Default capacity: 64KB, max frame size: 16 MiB.
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a new frame decoder with a custom maximum frame size.
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForLength,
            max_frame_size,
        }
    }

    /// Push data into the decoder and extract all complete frame payloads.
    ///
    /// This is the main API for processing incoming data from the socket.
    /// Returns the payloads of every frame completed by this chunk, in wire
    /// order. If data is fragmented, partial data is buffered internally for
    /// the next push.
    ///
    /// # Errors
    ///
    /// Returns [`WirelineError::FrameTooLarge`] exactly once when a frame
    /// declares a length above the configured maximum. The buffer is
    /// discarded and the decoder stops processing: every later `push` is a
    /// no-op returning no frames, until [`reset`](Self::reset) is called.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        if matches!(self.state, State::Poisoned) {
            return Ok(Vec::new());
        }

        self.buffer.extend_from_slice(data);

        let mut payloads = Vec::new();

        // Process as many complete frames as possible
        while let Some(payload) = self.try_extract_one()? {
            payloads.push(payload);
        }

        Ok(payloads)
    }

    /// Try to extract a single frame payload from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(payload))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the declared length exceeds the maximum
    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        match self.state {
            State::WaitingForLength => {
                let Some(declared) = read_length(&self.buffer) else {
                    return Ok(None);
                };

                if declared > self.max_frame_size {
                    // Framing is unrecoverable from here: nothing in the
                    // buffer can be trusted to start at a frame boundary.
                    self.buffer.clear();
                    self.state = State::Poisoned;
                    return Err(WirelineError::FrameTooLarge {
                        size: declared,
                        max: self.max_frame_size,
                    });
                }

                // Consume prefix bytes
                let _ = self.buffer.split_to(LEN_PREFIX_SIZE);

                if declared == 0 {
                    // Empty payload, frame is complete
                    return Ok(Some(Bytes::new()));
                }

                self.state = State::WaitingForPayload {
                    remaining: declared,
                };

                // Try to get the payload immediately
                self.try_extract_one()
            }

            State::WaitingForPayload { remaining } => {
                let remaining = remaining as usize;

                if self.buffer.len() < remaining {
                    return Ok(None);
                }

                // Extract payload (zero-copy freeze)
                let payload = self.buffer.split_to(remaining).freeze();

                self.state = State::WaitingForLength;

                Ok(Some(payload))
            }

            State::Poisoned => Ok(None),
        }
    }

    /// Number of buffered bytes not yet forming a complete frame.
    ///
    /// Observability only; never used for control flow.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard the buffer unconditionally and clear any poisoned state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForLength;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForLength => "WaitingForLength",
            State::WaitingForPayload { .. } => "WaitingForPayload",
            State::Poisoned => "Poisoned",
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    #[test]
    fn test_single_complete_frame() {
        let mut decoder = FrameDecoder::new();

        let payloads = decoder.push(&build_frame(b"\x01hello")).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"\x01hello");
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut decoder = FrameDecoder::new();

        let mut combined = Vec::new();
        combined.extend_from_slice(&build_frame(b"first"));
        combined.extend_from_slice(&build_frame(b"second"));
        combined.extend_from_slice(&build_frame(b"third"));

        let payloads = decoder.push(&combined).unwrap();

        assert_eq!(payloads.len(), 3);
        assert_eq!(&payloads[0][..], b"first");
        assert_eq!(&payloads[1][..], b"second");
        assert_eq!(&payloads[2][..], b"third");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_fragmented_length_prefix() {
        let mut decoder = FrameDecoder::new();
        let frame = build_frame(b"test");

        // Push 2 of the 4 prefix bytes
        let payloads = decoder.push(&frame[..2]).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(decoder.state_name(), "WaitingForLength");

        // Push the rest of the prefix and the payload
        let payloads = decoder.push(&frame[2..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"test");
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_fragmented_payload() {
        let mut decoder = FrameDecoder::new();
        let payload = b"this is a longer payload that will be fragmented";
        let frame = build_frame(payload);

        // Push prefix + partial payload
        let partial_len = LEN_PREFIX_SIZE + 10;
        let payloads = decoder.push(&frame[..partial_len]).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(decoder.state_name(), "WaitingForPayload");

        // Push the rest of the payload
        let payloads = decoder.push(&frame[partial_len..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], &payload[..]);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut decoder = FrameDecoder::new();
        let frame = build_frame(b"hi");

        let mut all = Vec::new();
        for byte in &frame {
            all.extend(decoder.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(&all[0][..], b"hi");
    }

    #[test]
    fn test_empty_payload_emits_frame() {
        let mut decoder = FrameDecoder::new();

        let payloads = decoder.push(&build_frame(b"")).unwrap();

        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].is_empty());
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_large_payload() {
        let mut decoder = FrameDecoder::new();
        let payload = vec![0xAB; 1024 * 1024]; // 1MB

        let payloads = decoder.push(&build_frame(&payload)).unwrap();

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 1024 * 1024);
        assert!(payloads[0].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_oversized_frame_is_fatal() {
        let mut decoder = FrameDecoder::with_max_frame_size(100);

        // Prefix declaring a 1000-byte payload
        let result = decoder.push(&1000u32.to_le_bytes());

        assert!(matches!(
            result,
            Err(WirelineError::FrameTooLarge { size: 1000, max: 100 })
        ));
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_oversized_reported_exactly_once() {
        let mut decoder = FrameDecoder::with_max_frame_size(100);

        let result = decoder.push(&1000u32.to_le_bytes());
        assert!(result.is_err());
        assert_eq!(decoder.state_name(), "Poisoned");

        // Later pushes are silently ignored, even valid frames
        let payloads = decoder.push(&build_frame(b"ok")).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_reset_clears_poisoned_state() {
        let mut decoder = FrameDecoder::with_max_frame_size(100);

        decoder.push(&1000u32.to_le_bytes()).unwrap_err();
        decoder.reset();
        assert_eq!(decoder.state_name(), "WaitingForLength");

        let payloads = decoder.push(&build_frame(b"ok")).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"ok");
    }

    #[test]
    fn test_oversized_after_valid_frames() {
        let mut decoder = FrameDecoder::with_max_frame_size(100);

        // One valid frame followed by an oversized declaration in one chunk
        let mut combined = build_frame(b"fine");
        combined.extend_from_slice(&5000u32.to_le_bytes());

        let result = decoder.push(&combined);
        assert!(result.is_err());
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_frame_at_exact_maximum_is_accepted() {
        let mut decoder = FrameDecoder::with_max_frame_size(8);

        let payloads = decoder.push(&build_frame(&[0x55; 8])).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].len(), 8);
    }

    #[test]
    fn test_mixed_complete_and_partial() {
        let mut decoder = FrameDecoder::new();

        let frame1 = build_frame(b"first");
        let frame2 = build_frame(b"second");

        // Push first complete frame + part of the second
        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..3]);

        let payloads = decoder.push(&data).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"first");
        assert_eq!(decoder.pending_bytes(), 3);

        // Complete the second frame
        let payloads = decoder.push(&frame2[3..]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(&payloads[0][..], b"second");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        let frame = build_frame(b"partial");

        decoder.push(&frame[..LEN_PREFIX_SIZE + 2]).unwrap();
        assert_eq!(decoder.state_name(), "WaitingForPayload");
        assert!(decoder.pending_bytes() > 0);

        decoder.reset();

        assert_eq!(decoder.state_name(), "WaitingForLength");
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_pending_bytes_tracks_buffered_data() {
        let mut decoder = FrameDecoder::new();

        // Partial prefix
        decoder.push(&[8, 0, 0]).unwrap();
        assert_eq!(decoder.pending_bytes(), 3);

        // Prefix completes (8-byte payload declared), prefix is consumed
        decoder.push(&[0]).unwrap();
        assert_eq!(decoder.pending_bytes(), 0);

        // Partial payload
        decoder.push(&[9, 9]).unwrap();
        assert_eq!(decoder.pending_bytes(), 2);

        // Payload completes
        let payloads = decoder.push(&[9; 6]).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(decoder.pending_bytes(), 0);
    }
}
