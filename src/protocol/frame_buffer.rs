//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. An incomplete
//! frame is a buffering signal, not an error: `push` simply returns the
//! frames that are complete so far and holds the tail for the next read.
//! Back-to-back frames in a single read are all extracted in arrival order.
//!
//! # Example
//!
//! ```ignore
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer.push(&chunk)?;
//! for frame in frames {
//!     dispatch(frame);
//! }
//! ```

use bytes::BytesMut;

use super::wire_format::{Header, DEFAULT_MAX_BODY_SIZE, HEADER_SIZE};
use super::Frame;
use crate::error::{Result, RoomcastError};

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete 16-byte header.
    WaitingForHeader,
    /// Header parsed, waiting for the declared body bytes.
    WaitingForBody { header: Header },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
///
/// All data is stored in a single `BytesMut` to minimize allocations.
pub struct FrameBuffer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum accepted body size.
    max_body_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::WaitingForHeader,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Create a new frame buffer with a custom max body size.
    pub fn with_max_body(max_body_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            state: State::WaitingForHeader,
            max_body_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Returns the frames completed by this read, in wire arrival order.
    /// Fragmented data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`RoomcastError::MalformedHeader`] when a header declares
    /// inconsistent lengths or a body above the configured maximum.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on a malformed header
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        match &self.state {
            State::WaitingForHeader => {
                if self.buffer.len() < HEADER_SIZE {
                    return Ok(None);
                }

                let header = Header::decode(&self.buffer[..HEADER_SIZE])
                    .expect("buffer has enough bytes");

                if !header.lengths_consistent() {
                    return Err(RoomcastError::MalformedHeader(format!(
                        "total_len {} below header_len {}",
                        header.total_len, header.header_len
                    )));
                }

                let body_len = header.body_len();
                if body_len as u32 > self.max_body_size {
                    return Err(RoomcastError::MalformedHeader(format!(
                        "body size {} exceeds maximum {}",
                        body_len, self.max_body_size
                    )));
                }

                // Consume the fixed 16 bytes. Servers with header_len > 16
                // pad the header; the padding is consumed together with the
                // body so a partial read can never desync the stream.
                let _ = self.buffer.split_to(HEADER_SIZE);

                if body_len == 0 && header.header_len as usize == HEADER_SIZE {
                    return Ok(Some(Frame::new(header, bytes::Bytes::new())));
                }

                self.state = State::WaitingForBody { header };

                // Body may already be buffered
                self.try_extract_one()
            }

            State::WaitingForBody { header } => {
                let body_len = header.body_len();
                let padding = header.header_len as usize - HEADER_SIZE;

                if self.buffer.len() < padding + body_len {
                    return Ok(None);
                }

                if padding > 0 {
                    let _ = self.buffer.split_to(padding);
                }
                let body = self.buffer.split_to(body_len).freeze();
                let header = *header;

                self.state = State::WaitingForHeader;

                Ok(Some(Frame::new(header, body)))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{build_frame, Opcode, PROTO_PLAIN, PROTO_ZLIB};

    #[test]
    fn single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(Opcode::Cmd, 42, PROTO_PLAIN, b"hello");

        let frames = buffer.push(&frame_bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].op(), Opcode::Cmd);
        assert_eq!(frames[0].sequence(), 42);
        assert_eq!(frames[0].body(), b"hello");
        assert!(buffer.is_empty());
    }

    #[test]
    fn multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = Vec::new();
        combined.extend(build_frame(Opcode::Cmd, 1, PROTO_PLAIN, b"first"));
        combined.extend(build_frame(Opcode::HeartBeatReply, 2, 0, b"second"));
        combined.extend(build_frame(Opcode::Cmd, 3, PROTO_ZLIB, b"third"));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].sequence(), 1);
        assert_eq!(frames[1].sequence(), 2);
        assert_eq!(frames[2].sequence(), 3);
        assert_eq!(frames[1].op(), Opcode::HeartBeatReply);
        assert!(buffer.is_empty());
    }

    #[test]
    fn fragmented_header() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(Opcode::Cmd, 42, PROTO_PLAIN, b"test");

        // Push first 7 bytes of header
        let frames = buffer.push(&frame_bytes[..7]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForHeader");

        // Push rest of header and body
        let frames = buffer.push(&frame_bytes[7..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body(), b"test");
        assert!(buffer.is_empty());
    }

    #[test]
    fn fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let body = b"this is a longer body that will be fragmented";
        let frame_bytes = build_frame(Opcode::Cmd, 42, PROTO_PLAIN, body);

        let partial_len = HEADER_SIZE + 10;
        let frames = buffer.push(&frame_bytes[..partial_len]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buffer.state_name(), "WaitingForBody");

        let frames = buffer.push(&frame_bytes[partial_len..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body(), body);
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_body_frame() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(Opcode::HeartBeat, 42, 1, b"");

        let frames = buffer.push(&frame_bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].body().is_empty());
        assert_eq!(frames[0].header.total_len, HEADER_SIZE as u32);
    }

    #[test]
    fn max_body_validation() {
        let mut buffer = FrameBuffer::with_max_body(100);

        let header = Header::for_body(Opcode::Cmd, 42, PROTO_PLAIN, 1000);
        let result = buffer.push(&header.encode());

        assert!(matches!(result, Err(RoomcastError::MalformedHeader(_))));
    }

    #[test]
    fn inconsistent_lengths_rejected() {
        let mut buffer = FrameBuffer::new();

        // total_len below header_len
        let header = Header {
            total_len: 8,
            header_len: 16,
            proto_ver: 0,
            opcode: 5,
            sequence: 0,
        };
        let result = buffer.push(&header.encode());

        assert!(matches!(result, Err(RoomcastError::MalformedHeader(_))));
    }

    #[test]
    fn clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(Opcode::Cmd, 42, PROTO_PLAIN, b"test");

        buffer.push(&frame_bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForBody");

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForHeader");
        assert!(buffer.is_empty());
    }

    #[test]
    fn mixed_complete_and_partial() {
        let mut buffer = FrameBuffer::new();

        let frame1 = build_frame(Opcode::Cmd, 1, PROTO_PLAIN, b"first");
        let frame2 = build_frame(Opcode::Cmd, 2, PROTO_PLAIN, b"second");

        let mut data = frame1.clone();
        data.extend_from_slice(&frame2[..5]);

        let frames = buffer.push(&data).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence(), 1);

        let frames = buffer.push(&frame2[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence(), 2);
    }

    #[test]
    fn byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let frame_bytes = build_frame(Opcode::Cmd, 42, PROTO_PLAIN, b"hi");

        let mut all_frames = Vec::new();
        for byte in &frame_bytes {
            let frames = buffer.push(&[*byte]).unwrap();
            all_frames.extend(frames);
        }

        assert_eq!(all_frames.len(), 1);
        assert_eq!(all_frames[0].body(), b"hi");
    }

    #[test]
    fn oversized_header_len_skips_padding() {
        // header_len 20 declares 4 bytes of padding before the body
        let header = Header {
            total_len: 20 + 3,
            header_len: 20,
            proto_ver: 0,
            opcode: 5,
            sequence: 9,
        };
        let mut data = header.encode().to_vec();
        data.extend_from_slice(&[0, 0, 0, 0]); // padding
        data.extend_from_slice(b"abc");

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&data).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body(), b"abc");
    }
}
