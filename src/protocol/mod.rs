//! Protocol module - wire format, framing, and batch unframing.
//!
//! This module implements the binary frame protocol:
//! - 16-byte big-endian header encoding/decoding
//! - Frame buffer for accumulating partial reads
//! - Frame struct with typed accessors
//! - Batch unframer for decompressed multi-frame payloads

mod batch;
mod frame;
mod frame_buffer;
mod wire_format;

pub use batch::{unpack_batch, UnpackedBatch};
pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    Header, Opcode, AUTH_PROTO, DEFAULT_MAX_BODY_SIZE, HEADER_SIZE, HEARTBEAT_PROTO, PROTO_BROTLI,
    PROTO_PLAIN, PROTO_PLAIN_ALT, PROTO_ZLIB,
};
