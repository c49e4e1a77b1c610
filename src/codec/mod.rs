//! Codec module - wire value primitives for payload bodies.
//!
//! The transport core treats request and response bodies as opaque bytes;
//! the typed encoding of those bodies uses the primitives in [`wire`]:
//! fixed-width little-endian integers and floats, and u16-length-prefixed
//! UTF-8 strings.
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use wireline::codec::wire;
//!
//! let mut buf = BytesMut::new();
//! wire::put_u32(&mut buf, 42);
//! wire::put_str(&mut buf, "hello");
//!
//! let mut body = Bytes::from(buf);
//! assert_eq!(wire::get_u32(&mut body).unwrap(), 42);
//! assert_eq!(wire::get_str(&mut body).unwrap(), "hello");
//! ```

pub mod wire;
