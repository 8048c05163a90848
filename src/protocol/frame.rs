//! Frame struct with typed accessors.
//!
//! Represents one complete protocol frame with header and body. Frames are
//! transient: created per read/write cycle and consumed immediately by the
//! dispatcher. Uses `bytes::Bytes` for zero-copy body sharing.
//!
//! # Example
//!
//! ```
//! use roomcast::protocol::{Frame, Header, Opcode};
//! use bytes::Bytes;
//!
//! let header = Header::for_body(Opcode::Cmd, 42, 0, 5);
//! let frame = Frame::new(header, Bytes::from_static(b"hello"));
//!
//! assert_eq!(frame.op(), Opcode::Cmd);
//! assert_eq!(frame.body(), b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::{Header, Opcode, HEADER_SIZE};

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from header and body.
    pub fn new(header: Header, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Create a frame from header and raw bytes (copies data).
    pub fn from_parts(header: Header, body: &[u8]) -> Self {
        Self {
            header,
            body: Bytes::copy_from_slice(body),
        }
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the body length.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Get the typed opcode.
    #[inline]
    pub fn op(&self) -> Opcode {
        self.header.op()
    }

    /// Get the proto version tag.
    #[inline]
    pub fn proto_ver(&self) -> u16 {
        self.header.proto_ver
    }

    /// Get the sequence number.
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }
}

/// Build a complete frame as a single byte vector.
///
/// Writes `total_len = 16 + body.len()`, `header_len = 16`, then header then
/// body, in that order.
///
/// # Example
///
/// ```
/// use roomcast::protocol::{build_frame, Opcode};
///
/// let bytes = build_frame(Opcode::Auth, 1, 1, b"hello");
/// assert_eq!(bytes.len(), 16 + 5);
/// ```
pub fn build_frame(opcode: Opcode, sequence: u32, proto_ver: u16, body: &[u8]) -> Vec<u8> {
    let header = Header::for_body(opcode, sequence, proto_ver, body.len());
    let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf
}
