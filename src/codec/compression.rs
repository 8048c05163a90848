//! Payload decompression for command frames.
//!
//! A command frame's proto version tag selects among three unrelated decoding
//! paths: plain pass-through, a single zlib stream, or a brotli stream whose
//! decompressed bytes concatenate complete frames. The tag set is closed —
//! unknown values are rejected explicitly at the dispatch point rather than
//! falling through.
//!
//! Decompression fully materializes the output before further parsing; a
//! corrupt stream is a per-frame fault, not a session failure.

use std::io::Read;

use bytes::Bytes;

use crate::error::{Result, RoomcastError};
use crate::protocol::{PROTO_BROTLI, PROTO_PLAIN, PROTO_PLAIN_ALT, PROTO_ZLIB};

/// Body encoding of a command frame, derived from its proto version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// Body is already the final payload.
    Plain,
    /// Body is a single zlib stream holding one payload.
    Zlib,
    /// Body is a brotli stream holding concatenated frames.
    Brotli,
}

impl PayloadEncoding {
    /// Map a proto version tag onto the encoding set.
    ///
    /// Returns `None` for unknown tags; the session reports those as a
    /// recoverable per-frame fault.
    pub fn from_proto(proto_ver: u16) -> Option<Self> {
        match proto_ver {
            PROTO_PLAIN | PROTO_PLAIN_ALT => Some(Self::Plain),
            PROTO_ZLIB => Some(Self::Zlib),
            PROTO_BROTLI => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Whether decompressed bytes are a batch of concatenated frames.
    #[inline]
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Brotli)
    }

    /// Decompress a command body according to this encoding.
    ///
    /// Plain bodies pass through unchanged (zero-copy). Compressed bodies are
    /// fully materialized into a fresh buffer.
    pub fn decompress(&self, body: Bytes) -> Result<Bytes> {
        match self {
            Self::Plain => Ok(body),
            Self::Zlib => inflate_zlib(&body),
            Self::Brotli => inflate_brotli(&body),
        }
    }
}

/// Fully inflate a zlib stream.
fn inflate_zlib(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| RoomcastError::DecompressionFailed(format!("zlib: {}", e)))?;
    Ok(Bytes::from(out))
}

/// Fully inflate a brotli stream.
fn inflate_brotli(data: &[u8]) -> Result<Bytes> {
    let mut out = Vec::new();
    brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut out)
        .map_err(|e| RoomcastError::DecompressionFailed(format!("brotli: {}", e)))?;
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn brotli_compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::enc::BrotliCompress(&mut std::io::Cursor::new(data), &mut out, &params).unwrap();
        out
    }

    #[test]
    fn tag_dispatch() {
        assert_eq!(PayloadEncoding::from_proto(0), Some(PayloadEncoding::Plain));
        assert_eq!(PayloadEncoding::from_proto(1), Some(PayloadEncoding::Plain));
        assert_eq!(PayloadEncoding::from_proto(2), Some(PayloadEncoding::Zlib));
        assert_eq!(
            PayloadEncoding::from_proto(3),
            Some(PayloadEncoding::Brotli)
        );
        assert_eq!(PayloadEncoding::from_proto(4), None);
        assert_eq!(PayloadEncoding::from_proto(255), None);
    }

    #[test]
    fn only_brotli_is_batch() {
        assert!(!PayloadEncoding::Plain.is_batch());
        assert!(!PayloadEncoding::Zlib.is_batch());
        assert!(PayloadEncoding::Brotli.is_batch());
    }

    #[test]
    fn plain_passes_through_zero_copy() {
        let body = Bytes::from_static(b"{\"cmd\":\"X\"}");
        let out = PayloadEncoding::Plain.decompress(body.clone()).unwrap();
        assert_eq!(out.as_ptr(), body.as_ptr());
    }

    #[test]
    fn zlib_roundtrip() {
        let payload = b"{\"cmd\":\"DANMU\",\"data\":{\"text\":\"hello\"}}";
        let compressed = zlib_compress(payload);

        let out = PayloadEncoding::Zlib
            .decompress(Bytes::from(compressed))
            .unwrap();
        assert_eq!(&out[..], payload);
    }

    #[test]
    fn brotli_roundtrip() {
        let payload = vec![0x42u8; 4096];
        let compressed = brotli_compress(&payload);

        let out = PayloadEncoding::Brotli
            .decompress(Bytes::from(compressed))
            .unwrap();
        assert_eq!(&out[..], &payload[..]);
    }

    #[test]
    fn corrupt_zlib_is_decompression_failed() {
        let mut compressed = zlib_compress(b"{\"cmd\":\"X\"}");
        let mid = compressed.len() / 2;
        compressed[mid] ^= 0xFF;

        let result = PayloadEncoding::Zlib.decompress(Bytes::from(compressed));
        assert!(matches!(
            result,
            Err(RoomcastError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn garbage_brotli_is_decompression_failed() {
        let result =
            PayloadEncoding::Brotli.decompress(Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]));
        assert!(matches!(
            result,
            Err(RoomcastError::DecompressionFailed(_))
        ));
    }
}
