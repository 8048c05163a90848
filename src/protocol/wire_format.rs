//! Wire format encoding and decoding.
//!
//! Implements the 16-byte header format:
//! ```text
//! ┌───────────┬────────────┬───────────┬──────────┬──────────┐
//! │ Total Len │ Header Len │ Proto Ver │ Opcode   │ Sequence │
//! │ 4 bytes   │ 2 bytes    │ 2 bytes   │ 4 bytes  │ 4 bytes  │
//! │ uint32 BE │ uint16 BE  │ uint16 BE │ uint32 BE│ uint32 BE│
//! └───────────┴────────────┴───────────┴──────────┴──────────┘
//! ```
//!
//! All multi-byte integers are Big Endian. `total_len` counts header plus
//! body, so body length is always `total_len - header_len`.

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Default maximum body size accepted from the wire (16 MB).
pub const DEFAULT_MAX_BODY_SIZE: u32 = 16 * 1024 * 1024;

/// Proto version of outgoing auth frames.
pub const AUTH_PROTO: u16 = 1;

/// Proto version of outgoing heartbeat frames.
pub const HEARTBEAT_PROTO: u16 = 1;

/// Proto version tag: body is the final payload as-is.
pub const PROTO_PLAIN: u16 = 0;

/// Alternate plain tag used by some server versions.
pub const PROTO_PLAIN_ALT: u16 = 1;

/// Proto version tag: body is a single zlib stream.
pub const PROTO_ZLIB: u16 = 2;

/// Proto version tag: body is a brotli stream of concatenated frames.
pub const PROTO_BROTLI: u16 = 3;

/// Frame purpose, decoded from the header's opcode field.
///
/// The set is closed at the dispatch point: values outside the known range
/// decode to [`Opcode::Unknown`] rather than failing, and the session decides
/// what to do with them (log and skip).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Server-side protocol error, terminal for the session.
    Error,
    /// Outgoing keep-alive.
    HeartBeat,
    /// Server answer to a heartbeat, carries the room popularity counter.
    HeartBeatReply,
    /// Application command, possibly batch-compressed.
    Cmd,
    /// Outgoing authentication request.
    Auth,
    /// Server answer to the auth request.
    AuthReply,
    /// Any opcode value outside the known set.
    Unknown(u32),
}

impl Opcode {
    /// Map a wire value onto the opcode set.
    pub fn from_wire(value: u32) -> Self {
        match value {
            1 => Opcode::Error,
            2 => Opcode::HeartBeat,
            3 => Opcode::HeartBeatReply,
            5 => Opcode::Cmd,
            7 => Opcode::Auth,
            8 => Opcode::AuthReply,
            other => Opcode::Unknown(other),
        }
    }

    /// Wire value of this opcode.
    pub fn to_wire(self) -> u32 {
        match self {
            Opcode::Error => 1,
            Opcode::HeartBeat => 2,
            Opcode::HeartBeatReply => 3,
            Opcode::Cmd => 5,
            Opcode::Auth => 7,
            Opcode::AuthReply => 8,
            Opcode::Unknown(other) => other,
        }
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame length in bytes (header + body).
    pub total_len: u32,
    /// Header length in bytes (always 16 for frames we encode).
    pub header_len: u16,
    /// Proto version tag selecting the body encoding.
    pub proto_ver: u16,
    /// Frame purpose (raw wire value, see [`Opcode`]).
    pub opcode: u32,
    /// Client-assigned monotonic sequence number.
    pub sequence: u32,
}

impl Header {
    /// Create a header for a body of the given length.
    ///
    /// `total_len` is derived as `HEADER_SIZE + body_len` and `header_len`
    /// is always 16.
    pub fn for_body(opcode: Opcode, sequence: u32, proto_ver: u16, body_len: usize) -> Self {
        Self {
            total_len: (HEADER_SIZE + body_len) as u32,
            header_len: HEADER_SIZE as u16,
            proto_ver,
            opcode: opcode.to_wire(),
            sequence,
        }
    }

    /// Body length declared by this header.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.total_len.saturating_sub(self.header_len as u32) as usize
    }

    /// Typed opcode view of the raw wire value.
    #[inline]
    pub fn op(&self) -> Opcode {
        Opcode::from_wire(self.opcode)
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use roomcast::protocol::{Header, Opcode};
    ///
    /// let header = Header::for_body(Opcode::Auth, 1, 1, 5);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 16);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.total_len.to_be_bytes());
        buf[4..6].copy_from_slice(&self.header_len.to_be_bytes());
        buf[6..8].copy_from_slice(&self.proto_ver.to_be_bytes());
        buf[8..12].copy_from_slice(&self.opcode.to_be_bytes());
        buf[12..16].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if fewer than 16 bytes are available. Opcode and proto
    /// version values are not validated here — unknown values pass through to
    /// the dispatcher, which decides.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            total_len: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            header_len: u16::from_be_bytes([buf[4], buf[5]]),
            proto_ver: u16::from_be_bytes([buf[6], buf[7]]),
            opcode: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            sequence: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// Check internal length consistency: `total_len >= header_len` and the
    /// header covers at least the fixed 16 bytes.
    pub fn lengths_consistent(&self) -> bool {
        self.total_len >= self.header_len as u32 && self.header_len as usize >= HEADER_SIZE
    }
}
