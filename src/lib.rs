//! # wireline
//!
//! Pipelined binary wire-protocol client for Rust.
//!
//! This crate multiplexes many concurrent logical request/response
//! exchanges over a single ordered TCP connection. Requests are written
//! back-to-back without waiting for earlier responses (pipelining), and
//! responses are matched to requests by strict FIFO order; the protocol
//! carries no correlation IDs.
//!
//! ## Architecture
//!
//! - **Frame decoding** ([`protocol`]): reassembles 4-byte length-prefixed
//!   frames from arbitrarily fragmented or coalesced socket reads.
//! - **Pipeline manager** ([`Pipeline`]): tracks in-flight requests,
//!   enforces backpressure and timeouts, and resolves each `send` with the
//!   correctly-ordered response.
//!
//! ## Example
//!
//! ```ignore
//! use bytes::Bytes;
//! use wireline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> wireline::Result<()> {
//!     let pipeline = Pipeline::builder()
//!         .max_pending(500)
//!         .connect("127.0.0.1:9000")
//!         .await?;
//!
//!     let body = pipeline.send(Bytes::from_static(b"\x01ping")).await?;
//!     println!("{} byte response", body.len());
//!
//!     pipeline.destroy().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod transport;

mod pipeline;

pub use error::{Result, WirelineError};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_PENDING,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SWEEP_INTERVAL,
};
