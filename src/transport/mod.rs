//! Transport module - TCP connection helpers.
//!
//! The pipeline itself is generic over any `AsyncRead + AsyncWrite` duplex
//! stream; this module only provides the TCP convenience path. Connection
//! lifecycle beyond the initial connect (reconnection, backoff) is the
//! caller's responsibility.

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::Result;

/// Connect a TCP stream suitable for pipelined request/response traffic.
///
/// Disables Nagle's algorithm: pipelined requests are small and
/// latency-sensitive, and the protocol already batches at the frame level.
pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
