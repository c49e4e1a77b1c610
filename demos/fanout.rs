//! Fanout - many concurrent requests pipelined over one connection.
//!
//! This example demonstrates:
//! - Issuing N concurrent `send` calls from independent tasks
//! - FIFO response matching pairing every caller with its own response
//! - Observability accessors (`pending_count`, `pending_bytes`)
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=info cargo run --example fanout
//! ```

use std::time::Instant;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use wireline::codec::wire;
use wireline::protocol::{build_frame, FrameDecoder};
use wireline::Pipeline;

const REQUESTS: u32 = 1000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Echo server, answering strictly in arrival order
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

    let pipeline = Pipeline::builder()
        .max_pending(REQUESTS as usize)
        .connect(addr)
        .await?;

    let started = Instant::now();

    let mut handles = Vec::with_capacity(REQUESTS as usize);
    for i in 0..REQUESTS {
        let p = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let mut payload = BytesMut::new();
            wire::put_u8(&mut payload, 0x01);
            wire::put_u32(&mut payload, i);

            let mut body = p.send(payload.freeze()).await.unwrap();
            let echoed = wire::get_u32(&mut body).unwrap();
            assert_eq!(echoed, i, "response paired with the wrong request");
            assert!(!body.has_remaining());
        }));
    }

    tracing::info!(
        in_flight = pipeline.pending_count(),
        buffered = pipeline.pending_bytes(),
        "requests issued"
    );

    for handle in handles {
        handle.await?;
    }

    println!(
        "{} pipelined round trips over one connection in {:?}",
        REQUESTS,
        started.elapsed()
    );

    pipeline.destroy().await;
    Ok(())
}
