//! Error types for roomcast.

use thiserror::Error;

/// Main error type for all roomcast operations.
///
/// Per-frame faults (`DecompressionFailed`, `TruncatedBatch`) are recoverable:
/// the session drops that frame's payload, reports the fault as an event, and
/// stays live. Connection-level failures (`AuthFailed`, `ProtocolError`,
/// `TransportClosed`) terminate the session.
///
/// An incomplete frame is deliberately *not* an error — the frame buffer
/// treats it as "wait for more bytes".
#[derive(Debug, Error)]
pub enum RoomcastError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (auth body, command envelope,
    /// REST payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error during a REST lookup.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The REST endpoint answered with a nonzero status code.
    #[error("API rejected request: code {code}: {message}")]
    ApiRejected { code: i64, message: String },

    /// Frame header shorter than 16 bytes or internally inconsistent lengths.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// A compressed command payload could not be decompressed.
    /// Recoverable: that frame's payload is dropped.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// A command frame carried a proto version tag outside the known set.
    /// Recoverable: that frame's payload is dropped.
    #[error("Unsupported proto version tag {0}")]
    UnsupportedProto(u16),

    /// A decompressed batch ended in a partial frame. Recoverable: the
    /// unparsed tail is dropped, frames extracted before it are delivered.
    #[error("Truncated batch: {parsed} frames parsed, {leftover} trailing bytes dropped")]
    TruncatedBatch { parsed: usize, leftover: usize },

    /// The server rejected the auth handshake with a nonzero code.
    #[error("Authentication failed with code {0}")]
    AuthFailed(u32),

    /// The auth reply never arrived before the configured timeout.
    #[error("Authentication timed out")]
    AuthTimeout,

    /// The server sent an Error-opcode frame.
    #[error("Protocol error frame received")]
    ProtocolError,

    /// The transport closed while the session was running.
    #[error("Transport closed")]
    TransportClosed,
}

/// Result type alias using RoomcastError.
pub type Result<T> = std::result::Result<T, RoomcastError>;
