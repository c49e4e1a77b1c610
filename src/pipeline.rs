//! Pipeline manager: multiplexes logical requests over one connection.
//!
//! Turns a single ordered byte stream into many concurrent request/response
//! exchanges by pipelining: requests are written back-to-back without
//! waiting for earlier responses, and each decoded response frame resolves
//! the oldest outstanding request (strict FIFO).
//!
//! # Architecture
//!
//! ```text
//! Caller 1 ─┐
//! Caller 2 ─┼─► mpsc::Sender<Command> ─► Connection Task ─► TCP
//! Caller N ─┘        (send/destroy)       owns: write half,
//!                                         read half, FrameDecoder,
//!                                         pending VecDeque, sweep timer
//! ```
//!
//! Exactly one task mutates the pending queue and the decode buffer; callers
//! hold a cheaply-cloneable [`Pipeline`] handle and suspend on a `oneshot`
//! until their request resolves. The `oneshot` sender is consumed on use, so
//! every pending entry reaches exactly one terminal state.
//!
//! # Ordering assumption
//!
//! The protocol carries no correlation IDs: responses are matched to
//! requests purely by wire order. If the server ever reorders responses, a
//! response is silently matched to the wrong caller. That risk is inherent
//! to the protocol; this client preserves the semantics rather than
//! papering over them.
//!
//! # Example
//!
//! ```ignore
//! use wireline::Pipeline;
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> wireline::Result<()> {
//!     let pipeline = Pipeline::connect("127.0.0.1:9000").await?;
//!     let body = pipeline.send(Bytes::from_static(b"\x01ping")).await?;
//!     println!("{} byte response", body.len());
//!     pipeline.destroy().await;
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::ToSocketAddrs;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::error::{Result, WirelineError};
use crate::protocol::{
    build_frame, decode_error_body, is_error_tag, FrameDecoder, DEFAULT_MAX_FRAME_SIZE,
};
use crate::transport;

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default maximum in-flight requests before backpressure kicks in.
pub const DEFAULT_MAX_PENDING: usize = 1000;

/// Default interval between timeout sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

/// Default command channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Socket read buffer size.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Configuration for the pipeline connection task.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Age at which a pending request is failed by the sweep.
    pub request_timeout: Duration,
    /// Maximum in-flight requests before `send` rejects with backpressure.
    pub max_pending: usize,
    /// Maximum frame payload size, forwarded to the frame decoder.
    pub max_frame_size: u32,
    /// Interval between timeout sweeps.
    pub sweep_interval: Duration,
    /// Command channel capacity.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for configuring and creating a [`Pipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the maximum in-flight requests.
    ///
    /// When this limit is reached, `send` fails immediately with
    /// [`WirelineError::Backpressure`] and writes nothing.
    /// Default: 1000
    pub fn max_pending(mut self, limit: usize) -> Self {
        self.config.max_pending = limit;
        self
    }

    /// Set the maximum frame payload size.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, limit: u32) -> Self {
        self.config.max_frame_size = limit;
        self
    }

    /// Set the interval between timeout sweeps.
    ///
    /// Default: 1 second
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Set the command channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Connect to `addr` over TCP and spawn the connection task.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<Pipeline> {
        let stream = transport::connect(addr).await?;
        Ok(self.spawn(stream))
    }

    /// Spawn the connection task over an already-established duplex stream.
    ///
    /// The stream is exclusively owned by this pipeline; no two pipelines
    /// may share a transport.
    pub fn spawn<S>(self, io: S) -> Pipeline
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let pending_count = Arc::new(AtomicUsize::new(0));
        let buffered_bytes = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(AtomicBool::new(false));

        let max_pending = self.config.max_pending;

        tokio::spawn(connection_task(
            io,
            self.config,
            rx,
            pending_count.clone(),
            buffered_bytes.clone(),
        ));

        Pipeline {
            tx,
            pending_count,
            buffered_bytes,
            destroyed,
            max_pending,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands from handles to the connection task.
enum Command {
    Send {
        payload: Bytes,
        reply: oneshot::Sender<Result<Bytes>>,
    },
    Destroy,
}

/// One in-flight request, owned exclusively by the connection task.
///
/// Removed exactly once: by a matching frame, the timeout sweep, a fatal
/// decoder/transport failure, or teardown, whichever happens first.
struct Pending {
    /// Bookkeeping sequence number; never transmitted.
    seq: u32,
    /// When the request was recorded.
    enqueued_at: Instant,
    /// Single-resolution continuation back to the caller.
    reply: oneshot::Sender<Result<Bytes>>,
}

/// A running pipeline over one connection.
///
/// Cheaply cloneable; all clones share the same connection and pending set.
/// Dropping every clone tears the connection task down and fails any
/// still-outstanding requests.
#[derive(Clone)]
pub struct Pipeline {
    /// Command channel into the connection task.
    tx: mpsc::Sender<Command>,
    /// In-flight request count (for backpressure and observability).
    pending_count: Arc<AtomicUsize>,
    /// Decoder bytes not yet forming a complete frame.
    buffered_bytes: Arc<AtomicUsize>,
    /// Set once `destroy` has been called.
    destroyed: Arc<AtomicBool>,
    /// Maximum in-flight requests.
    max_pending: usize,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Connect to `addr` over TCP with default configuration.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Pipeline> {
        Self::builder().connect(addr).await
    }

    /// Spawn a pipeline over an existing duplex stream with default
    /// configuration.
    pub fn spawn<S>(io: S) -> Pipeline
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::builder().spawn(io)
    }

    /// Send one encoded request payload and await its response body.
    ///
    /// The payload is the full frame payload (operation tag + encoded body)
    /// as produced by the caller's encoder; this method adds the length
    /// prefix, writes the frame, and suspends until the matching response
    /// arrives, the request times out, or the connection fails.
    ///
    /// On success the returned body has the operation tag already stripped.
    /// An error-tagged response resolves to [`WirelineError::Server`] with
    /// the server's code and message.
    ///
    /// # Errors
    ///
    /// - [`WirelineError::Backpressure`]: in-flight count at capacity;
    ///   nothing was written.
    /// - [`WirelineError::Io`]: the transport rejected this write.
    /// - [`WirelineError::Timeout`]: the request outlived the configured
    ///   timeout.
    /// - [`WirelineError::FrameTooLarge`] / [`WirelineError::ConnectionClosed`] /
    ///   [`WirelineError::Destroyed`]: the connection failed as a whole.
    pub async fn send(&self, payload: Bytes) -> Result<Bytes> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(WirelineError::Destroyed);
        }

        // Synchronous backpressure check: reject cheaply, queue nothing
        if self.pending_count.load(Ordering::Acquire) >= self.max_pending {
            return Err(WirelineError::Backpressure);
        }

        // Count the request before it reaches the connection task so the
        // check above sees commands still in the channel
        self.pending_count.fetch_add(1, Ordering::AcqRel);

        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = Command::Send {
            payload,
            reply: reply_tx,
        };

        if self.tx.send(cmd).await.is_err() {
            self.pending_count.fetch_sub(1, Ordering::Release);
            return Err(WirelineError::ConnectionClosed);
        }

        match reply_rx.await {
            Ok(result) => result,
            // Connection task died without resolving; treat as closed
            Err(_) => Err(WirelineError::ConnectionClosed),
        }
    }

    /// Number of in-flight requests.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending_count.load(Ordering::Acquire)
    }

    /// Decoder bytes buffered but not yet forming a complete frame.
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.buffered_bytes.load(Ordering::Acquire)
    }

    /// Check whether `send` would currently reject with backpressure.
    #[inline]
    pub fn is_backpressure_active(&self) -> bool {
        self.pending_count.load(Ordering::Acquire) >= self.max_pending
    }

    /// Tear the pipeline down.
    ///
    /// Stops the timeout sweep, resets the frame decoder, and fails every
    /// pending request with [`WirelineError::Destroyed`]. Idempotent:
    /// calling it twice, or after the connection already failed, does
    /// nothing further and never double-resolves a request.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Ignore failure: the connection task may already be gone
        let _ = self.tx.send(Command::Destroy).await;
    }
}

/// The connection task: sole owner of the transport, the frame decoder, and
/// the pending queue.
async fn connection_task<S>(
    io: S,
    config: PipelineConfig,
    mut rx: mpsc::Receiver<Command>,
    pending_count: Arc<AtomicUsize>,
    buffered_bytes: Arc<AtomicUsize>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(io);
    let mut decoder = FrameDecoder::with_max_frame_size(config.max_frame_size);
    let mut pending: VecDeque<Pending> = VecDeque::new();
    let mut next_seq: u32 = 0;
    let mut sweep = tokio::time::interval(config.sweep_interval);
    let mut read_buf = vec![0u8; READ_BUF_SIZE];

    let terminal = loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Send { payload, reply }) => {
                    let seq = next_seq;
                    next_seq = next_seq.wrapping_add(1);

                    let frame = build_frame(&payload);
                    if let Err(e) = writer.write_all(&frame).await {
                        // Write failure is narrow: fail this call, leave the
                        // rest of the pending set untouched
                        tracing::debug!(seq, error = %e, "request write failed");
                        pending_count.fetch_sub(1, Ordering::Release);
                        let _ = reply.send(Err(WirelineError::Io(e)));
                        continue;
                    }

                    tracing::debug!(seq, len = payload.len(), "request written");
                    pending.push_back(Pending {
                        seq,
                        enqueued_at: Instant::now(),
                        reply,
                    });
                }
                Some(Command::Destroy) | None => {
                    break WirelineError::Destroyed;
                }
            },

            n = reader.read(&mut read_buf) => match n {
                Ok(0) => {
                    tracing::debug!("connection closed by peer");
                    break WirelineError::ConnectionClosed;
                }
                Ok(n) => {
                    match decoder.push(&read_buf[..n]) {
                        Ok(payloads) => {
                            buffered_bytes.store(decoder.pending_bytes(), Ordering::Release);
                            for payload in payloads {
                                dispatch_response(payload, &mut pending, &pending_count);
                            }
                        }
                        Err(e) => {
                            // Stream framing is unrecoverable; the connection
                            // must be treated as broken
                            tracing::error!(error = %e, "fatal decode error");
                            break e;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "transport read error");
                    break WirelineError::Io(e);
                }
            },

            _ = sweep.tick() => {
                sweep_expired(&mut pending, config.request_timeout, &pending_count);
            }
        }
    };

    // Teardown: every still-outstanding request resolves exactly once
    decoder.reset();
    buffered_bytes.store(0, Ordering::Release);

    let failed = pending.len();
    for entry in pending.drain(..) {
        pending_count.fetch_sub(1, Ordering::Release);
        let _ = entry.reply.send(Err(replicate_terminal(&terminal)));
    }
    if failed > 0 {
        tracing::debug!(failed, error = %terminal, "failed outstanding requests on teardown");
    }

    // Commands still queued behind the terminal event get the same answer
    rx.close();
    while let Ok(cmd) = rx.try_recv() {
        if let Command::Send { reply, .. } = cmd {
            pending_count.fetch_sub(1, Ordering::Release);
            let _ = reply.send(Err(replicate_terminal(&terminal)));
        }
    }
}

/// Match a decoded frame payload against the oldest pending request.
fn dispatch_response(
    payload: Bytes,
    pending: &mut VecDeque<Pending>,
    pending_count: &AtomicUsize,
) {
    let Some(entry) = pending.pop_front() else {
        // Valid protocol behavior: the server may push messages with no
        // request correlate
        tracing::warn!(len = payload.len(), "unsolicited frame, dropping");
        return;
    };

    pending_count.fetch_sub(1, Ordering::Release);
    tracing::debug!(seq = entry.seq, len = payload.len(), "response matched");
    let _ = entry.reply.send(interpret_response(payload));
}

/// Interpret a response payload: strip the operation tag, dispatch error
/// bodies vs. success bodies.
fn interpret_response(payload: Bytes) -> Result<Bytes> {
    if payload.is_empty() {
        // Zero-length frames are legal and carry no tag
        return Ok(payload);
    }

    let tag = payload[0];
    let body = payload.slice(1..);

    if is_error_tag(tag) {
        let (code, message) = decode_error_body(&body)?;
        Err(WirelineError::Server { code, message })
    } else {
        Ok(body)
    }
}

/// Fail every pending entry older than the configured timeout.
///
/// Entries are enqueued in age order, so expired entries are always a
/// prefix of the queue.
fn sweep_expired(
    pending: &mut VecDeque<Pending>,
    timeout: Duration,
    pending_count: &AtomicUsize,
) {
    let now = Instant::now();
    while pending
        .front()
        .is_some_and(|entry| now.duration_since(entry.enqueued_at) >= timeout)
    {
        if let Some(entry) = pending.pop_front() {
            pending_count.fetch_sub(1, Ordering::Release);
            tracing::warn!(seq = entry.seq, "request timed out");
            let _ = entry.reply.send(Err(WirelineError::Timeout));
        }
    }
}

/// Re-create a terminal error for each entry failed by a broad teardown.
///
/// `WirelineError` is not `Clone` (it carries `std::io::Error`), so broad
/// failures rebuild an equivalent error per pending entry.
fn replicate_terminal(terminal: &WirelineError) -> WirelineError {
    match terminal {
        WirelineError::Destroyed => WirelineError::Destroyed,
        WirelineError::ConnectionClosed => WirelineError::ConnectionClosed,
        WirelineError::FrameTooLarge { size, max } => WirelineError::FrameTooLarge {
            size: *size,
            max: *max,
        },
        WirelineError::Io(e) => {
            WirelineError::Io(std::io::Error::new(e.kind(), e.to_string()))
        }
        other => WirelineError::Protocol(other.to_string()),
    }
}
