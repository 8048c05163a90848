//! Batch unframer for decompressed command payloads.
//!
//! A batch-compressed command frame decompresses to a concatenation of
//! complete frames, each with its own 16-byte header. The unframer walks the
//! buffer as a bounded loop (decode one header, advance by its `total_len`,
//! repeat) rather than recursing, so it composes if nesting depth ever grows.
//!
//! A trailing partial frame is a fault, not a retry point: the batch was
//! already fully decompressed, so the tail is dropped and reported while the
//! frames extracted before it are still delivered in ascending-offset order.

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE};
use super::Frame;

/// Result of unframing one decompressed batch buffer.
#[derive(Debug)]
pub struct UnpackedBatch {
    /// Complete frames in ascending-offset (wire) order.
    pub frames: Vec<Frame>,
    /// Number of unparsed trailing bytes, zero when the buffer ended on a
    /// frame boundary.
    pub leftover: usize,
}

impl UnpackedBatch {
    /// Whether the buffer ended in a partial frame.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.leftover > 0
    }
}

/// Split a decompressed buffer into its concatenated frames.
///
/// The input is shared (`Bytes`), so each extracted frame's body is a
/// zero-copy slice of it.
///
/// # Example
///
/// ```
/// use roomcast::protocol::{build_frame, unpack_batch, Opcode};
/// use bytes::Bytes;
///
/// let mut buf = build_frame(Opcode::Cmd, 1, 0, b"{\"cmd\":\"X\"}");
/// buf.extend(build_frame(Opcode::Cmd, 2, 0, b"{\"cmd\":\"Y\"}"));
///
/// let batch = unpack_batch(Bytes::from(buf));
/// assert_eq!(batch.frames.len(), 2);
/// assert!(!batch.is_truncated());
/// ```
pub fn unpack_batch(buf: Bytes) -> UnpackedBatch {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let remaining = buf.len() - offset;
        if remaining < HEADER_SIZE {
            break;
        }

        let header = Header::decode(&buf[offset..]).expect("remaining >= HEADER_SIZE");
        if !header.lengths_consistent() {
            // A garbled nested header makes the rest of the buffer
            // unwalkable; treat everything from here as the dropped tail.
            break;
        }

        let total = header.total_len as usize;
        if remaining < total {
            break;
        }

        let body_start = offset + header.header_len as usize;
        let body = buf.slice(body_start..offset + total);
        frames.push(Frame::new(header, body));

        offset += total;
    }

    UnpackedBatch {
        frames,
        leftover: buf.len() - offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, Opcode, PROTO_PLAIN};

    fn cmd_frame(seq: u32, body: &[u8]) -> Vec<u8> {
        build_frame(Opcode::Cmd, seq, PROTO_PLAIN, body)
    }

    #[test]
    fn empty_buffer_yields_nothing() {
        let batch = unpack_batch(Bytes::new());
        assert!(batch.frames.is_empty());
        assert_eq!(batch.leftover, 0);
        assert!(!batch.is_truncated());
    }

    #[test]
    fn single_frame() {
        let batch = unpack_batch(Bytes::from(cmd_frame(1, b"{\"cmd\":\"DANMU\"}")));
        assert_eq!(batch.frames.len(), 1);
        assert_eq!(batch.frames[0].body(), b"{\"cmd\":\"DANMU\"}");
        assert!(!batch.is_truncated());
    }

    #[test]
    fn n_frames_in_wire_order() {
        let mut buf = Vec::new();
        for i in 0..5u32 {
            buf.extend(cmd_frame(i, format!("{{\"cmd\":\"C{}\"}}", i).as_bytes()));
        }

        let batch = unpack_batch(Bytes::from(buf));

        assert_eq!(batch.frames.len(), 5);
        for (i, frame) in batch.frames.iter().enumerate() {
            assert_eq!(frame.sequence(), i as u32);
            assert_eq!(frame.body(), format!("{{\"cmd\":\"C{}\"}}", i).as_bytes());
        }
        assert!(!batch.is_truncated());
    }

    #[test]
    fn truncated_tail_drops_last_frame_only() {
        let mut buf = Vec::new();
        for i in 0..3u32 {
            buf.extend(cmd_frame(i, b"{\"cmd\":\"X\"}"));
        }
        buf.pop(); // one byte short

        let batch = unpack_batch(Bytes::from(buf));

        assert_eq!(batch.frames.len(), 2);
        assert!(batch.is_truncated());
        assert_eq!(batch.leftover, HEADER_SIZE + 11 - 1);
    }

    #[test]
    fn partial_header_tail() {
        let mut buf = cmd_frame(1, b"{\"cmd\":\"X\"}");
        buf.extend_from_slice(&[0x00, 0x00, 0x01]); // 3 stray bytes

        let batch = unpack_batch(Bytes::from(buf));

        assert_eq!(batch.frames.len(), 1);
        assert_eq!(batch.leftover, 3);
        assert!(batch.is_truncated());
    }

    #[test]
    fn garbled_nested_header_stops_walk() {
        let mut buf = cmd_frame(1, b"{\"cmd\":\"X\"}");
        // Nested header with total_len < header_len
        let bad = Header {
            total_len: 4,
            header_len: 16,
            proto_ver: 0,
            opcode: 5,
            sequence: 2,
        };
        buf.extend_from_slice(&bad.encode());

        let batch = unpack_batch(Bytes::from(buf));

        assert_eq!(batch.frames.len(), 1);
        assert_eq!(batch.leftover, HEADER_SIZE);
    }

    #[test]
    fn bodies_are_zero_copy_slices() {
        let buf = Bytes::from(cmd_frame(1, b"{\"cmd\":\"X\"}"));
        let base = buf.as_ptr() as usize;

        let batch = unpack_batch(buf);

        let body_ptr = batch.frames[0].body.as_ptr() as usize;
        assert_eq!(body_ptr, base + HEADER_SIZE);
    }
}
