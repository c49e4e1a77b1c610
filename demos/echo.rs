//! Echo round trip - simple request/response example.
//!
//! This example demonstrates:
//! - Spawning a minimal in-process echo server over TCP
//! - Connecting a pipeline with the builder
//! - Sending one encoded request and reading the response body
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example echo
//! ```

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use wireline::protocol::{build_frame, FrameDecoder};
use wireline::Pipeline;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Minimal echo server: decode each request frame, echo its body back
    // under the same tag, in arrival order
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut decoder = FrameDecoder::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            for payload in decoder.push(&buf[..n]).unwrap() {
                if stream.write_all(&build_frame(&payload)).await.is_err() {
                    return;
                }
            }
        }
    });

    let pipeline = Pipeline::builder().connect(addr).await?;

    let body = pipeline.send(Bytes::from_static(b"\x01hello, wire")).await?;
    println!("response body: {:?}", std::str::from_utf8(&body)?);

    pipeline.destroy().await;
    Ok(())
}
