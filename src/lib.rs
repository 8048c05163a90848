//! # roomcast
//!
//! Client engine for a live-chat/event broadcast service reachable over a
//! persistent binary-framed connection.
//!
//! ## Architecture
//!
//! - **REST lookups** ([`api`]): resolve a room's auth token and connect-host
//!   list. The engine consumes the token and one chosen host; transport setup
//!   and host selection stay with the caller.
//! - **Frame protocol** ([`protocol`]): 16-byte big-endian headers, opcode
//!   dispatch, incremental frame extraction, batch unframing.
//! - **Payload codecs** ([`codec`]): plain / zlib / brotli command bodies.
//! - **Session** ([`session`]): auth handshake, heartbeat timer, read loop,
//!   and the ordered [`SessionEvent`] stream handed to the consumer.
//!
//! ## Example
//!
//! ```ignore
//! use roomcast::{DirectoryClient, Session, SessionConfig, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let directory = DirectoryClient::new("https://api.example.com")?;
//!     let identity = directory.room_identity(3).await?;
//!     let auth = directory.room_auth(identity.room_id).await?;
//!
//!     let stream = connect(&auth.host_list[0]).await?; // external transport
//!     let mut session =
//!         Session::start(stream, SessionConfig::new(identity.room_id, auth.token)).await?;
//!
//!     while let Some(event) = session.next_event().await {
//!         if let SessionEvent::Command(msg) = event {
//!             println!("{}", msg.command);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod codec;
pub mod error;
pub mod message;
pub mod protocol;
pub mod session;

mod writer;

pub use api::{DirectoryClient, HostEntry, RoomAuthInfo, RoomIdentity};
pub use error::{Result, RoomcastError};
pub use message::{AuthReply, AuthRequest, CommandMessage, HeartbeatReply};
pub use session::{CloseReason, Session, SessionConfig, SessionEvent, SessionState};
