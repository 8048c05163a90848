//! Codec module - payload decompression for command frames.
//!
//! The command stream carries three body encodings, selected by the frame
//! header's proto version tag:
//!
//! - [`PayloadEncoding::Plain`] - pass-through
//! - [`PayloadEncoding::Zlib`] - single zlib stream (`flate2`)
//! - [`PayloadEncoding::Brotli`] - brotli stream of concatenated frames
//!
//! # Example
//!
//! ```
//! use roomcast::codec::PayloadEncoding;
//! use bytes::Bytes;
//!
//! let encoding = PayloadEncoding::from_proto(0).unwrap();
//! let body = Bytes::from_static(b"{\"cmd\":\"X\"}");
//! assert_eq!(encoding.decompress(body.clone()).unwrap(), body);
//! ```

mod compression;

pub use compression::PayloadEncoding;
