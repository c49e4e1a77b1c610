//! Error types for wireline.

use thiserror::Error;

/// Main error type for all wireline operations.
#[derive(Debug, Error)]
pub enum WirelineError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame declared a length above the configured maximum.
    ///
    /// This is fatal for the connection: stream framing can no longer be
    /// trusted, so every outstanding request is failed and the caller must
    /// treat the connection as broken.
    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared payload length.
        size: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Protocol error (malformed error body, truncated field, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Pending request count is at capacity; nothing was written.
    #[error("Backpressure limit reached")]
    Backpressure,

    /// Request exceeded the configured timeout and was failed by the sweep.
    #[error("Request timed out")]
    Timeout,

    /// Connection closed or the connection task is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The pipeline was explicitly destroyed.
    #[error("Pipeline destroyed")]
    Destroyed,

    /// Server-reported application error, decoded from an error response
    /// frame. Narrow: fails only the one call that asked.
    #[error("Server error {code}: {message}")]
    Server {
        /// Server-assigned error code.
        code: u8,
        /// Human-readable message, verbatim from the wire.
        message: String,
    },
}

/// Result type alias using WirelineError.
pub type Result<T> = std::result::Result<T, WirelineError>;
