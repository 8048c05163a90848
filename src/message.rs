//! Typed frame bodies.
//!
//! Builders and decoders for the bodies carried by each opcode: the JSON auth
//! handshake, the heartbeat reply with its popularity counter, and the JSON
//! command envelope.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomcastError};
use crate::protocol::Header;

/// Body of an outgoing auth frame, serialized as JSON.
///
/// # Example
///
/// ```
/// use roomcast::message::AuthRequest;
///
/// let auth = AuthRequest::new(0, 42, "token");
/// let body = auth.to_body().unwrap();
/// assert!(body.starts_with(b"{"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Viewer user id, 0 for anonymous sessions.
    pub uid: u64,
    /// Numeric room id (the long form, not the short id).
    pub roomid: u64,
    /// Highest batch proto version the client understands.
    pub protover: u16,
    /// Client platform label.
    pub platform: String,
    /// Client type discriminator.
    #[serde(rename = "type")]
    pub client_type: u32,
    /// Authorization token from the room auth lookup.
    pub key: String,
}

impl AuthRequest {
    /// Create an auth request with the default platform ("web", type 2,
    /// protover 3).
    pub fn new(uid: u64, roomid: u64, key: impl Into<String>) -> Self {
        Self {
            uid,
            roomid,
            protover: 3,
            platform: "web".to_string(),
            client_type: 2,
            key: key.into(),
        }
    }

    /// Serialize to the JSON frame body.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Body of an incoming auth reply frame.
///
/// `code` 0 means the handshake succeeded; any other value is a
/// protocol-level auth failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthReply {
    /// Server-reported status code.
    pub code: u32,
}

impl AuthReply {
    /// Decode from a frame body.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Whether the handshake succeeded.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Decoded heartbeat reply.
///
/// The body starts with a big-endian u32 popularity counter (live room heat),
/// optionally followed by a trailing message payload.
#[derive(Debug, Clone)]
pub struct HeartbeatReply {
    /// Server-reported popularity counter.
    pub popularity: u32,
    /// Optional trailing payload.
    pub message: Bytes,
}

impl HeartbeatReply {
    /// Decode from a frame body.
    pub fn from_body(body: Bytes) -> Result<Self> {
        if body.len() < 4 {
            return Err(RoomcastError::MalformedHeader(format!(
                "heartbeat reply body too short: {} bytes",
                body.len()
            )));
        }
        let popularity = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        Ok(Self {
            popularity,
            message: body.slice(4..),
        })
    }
}

/// One logical command message recovered from a command frame.
///
/// A single wire frame may expand into many of these after decompression and
/// batch unframing. The command name comes from the JSON envelope's `"cmd"`
/// field, not from the wire header; the payload keeps the raw envelope JSON.
#[derive(Debug, Clone)]
pub struct CommandMessage {
    /// Header of the frame this message came from (the nested frame's header
    /// for batch payloads).
    pub header: Header,
    /// Command name from the envelope's `"cmd"` field.
    pub command: String,
    /// Raw JSON of the command envelope.
    pub payload: Bytes,
}

/// Minimal envelope view used only to pull out the command name.
#[derive(Deserialize)]
struct CmdEnvelope<'a> {
    #[serde(borrow)]
    cmd: &'a str,
}

impl CommandMessage {
    /// Build from a frame header and its (already plain) JSON envelope.
    pub fn from_envelope(header: Header, payload: Bytes) -> Result<Self> {
        let envelope: CmdEnvelope = serde_json::from_slice(&payload)?;
        Ok(Self {
            header,
            command: envelope.cmd.to_string(),
            payload,
        })
    }
}
