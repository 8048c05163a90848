//! Session state machine and runtime loop.
//!
//! Drives one connection through its lifecycle:
//!
//! ```text
//! Connecting ─► Authenticating ─► Live ─► Closed
//! ```
//!
//! On start the session sends one auth frame and waits for the reply under a
//! timeout. Once live, two activities run concurrently: a heartbeat task
//! ticking on an interval, and the read loop decoding inbound frames and
//! emitting [`SessionEvent`]s to the consumer in wire arrival order. Both
//! serialize their writes through the dedicated writer task.
//!
//! Per-frame decompression and unframing faults are absorbed here and
//! reported as [`SessionEvent::Fault`]; the session stays live. Transport
//! loss, auth failure, and Error-opcode frames terminate the session with a
//! single [`SessionEvent::Closed`].
//!
//! # Example
//!
//! ```ignore
//! let stream = connect_ws(&host).await?; // external transport setup
//! let mut session = Session::start(stream, SessionConfig::new(room_id, token)).await?;
//!
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         SessionEvent::Command(msg) => println!("{}: {:?}", msg.command, msg.payload),
//!         SessionEvent::Closed(reason) => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::codec::PayloadEncoding;
use crate::error::{Result, RoomcastError};
use crate::message::{AuthReply, AuthRequest, CommandMessage, HeartbeatReply};
use crate::protocol::{unpack_batch, Frame, FrameBuffer, Opcode, AUTH_PROTO, HEARTBEAT_PROTO};
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle};

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default auth reply timeout.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake done externally, auth frame not yet sent.
    Connecting,
    /// Auth frame sent, awaiting the reply.
    Authenticating,
    /// Authenticated; heartbeats and command dispatch running.
    Live,
    /// Terminal. No further sends or receives.
    Closed,
}

/// Why the session reached [`SessionState::Closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Server rejected the auth handshake with this code.
    AuthFailed(u32),
    /// The auth reply never arrived before the timeout.
    AuthTimeout,
    /// The server sent an Error-opcode frame.
    ProtocolError,
    /// Transport EOF or I/O failure.
    TransportClosed,
    /// The inbound byte stream desynchronized (malformed frame header).
    MalformedHeader(String),
    /// Local teardown via [`Session::shutdown`].
    ShutDown,
}

/// Event emitted to the consumer, in wire arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Auth reply with code 0 received; the session is live.
    Authenticated,
    /// Heartbeat reply carrying the room popularity counter.
    Heartbeat { popularity: u32 },
    /// One logical command message.
    Command(CommandMessage),
    /// Recoverable per-frame fault; the session stays live.
    Fault(RoomcastError),
    /// Terminal event, emitted exactly once.
    Closed(CloseReason),
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Viewer user id, 0 for anonymous sessions.
    pub uid: u64,
    /// Numeric room id.
    pub room_id: u64,
    /// Authorization token from the room auth lookup.
    pub token: String,
    /// Interval between outgoing heartbeats.
    pub heartbeat_interval: Duration,
    /// How long to wait for the auth reply.
    pub auth_timeout: Duration,
    /// Capacity of the consumer event channel.
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Create a config for the given room with default timings.
    pub fn new(room_id: u64, token: impl Into<String>) -> Self {
        Self {
            uid: 0,
            room_id,
            token: token.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the viewer user id.
    pub fn uid(mut self, uid: u64) -> Self {
        self.uid = uid;
        self
    }

    /// Set the heartbeat interval.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the auth reply timeout.
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }
}

/// A running session.
///
/// Owns the connection exclusively; dropping or shutting it down interrupts
/// the heartbeat and read activities promptly and releases the transport.
pub struct Session {
    events: mpsc::Receiver<SessionEvent>,
    state: watch::Receiver<SessionState>,
    shutdown: Option<oneshot::Sender<()>>,
    driver: JoinHandle<()>,
}

impl Session {
    /// Start a session on an established transport.
    ///
    /// Sends the auth frame immediately and spawns the driver; the auth
    /// outcome arrives as the first [`SessionEvent`].
    pub async fn start<S>(stream: S, config: SessionConfig) -> Result<Session>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let (writer, writer_task) = spawn_writer_task(write_half);

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let sequence = Arc::new(AtomicU32::new(1));

        // Auth goes out before the driver starts reading
        let auth = AuthRequest::new(config.uid, config.room_id, config.token.clone());
        let body = auth.to_body()?;
        let seq = sequence.fetch_add(1, Ordering::Relaxed);
        writer
            .send(OutboundFrame::new(Opcode::Auth, seq, AUTH_PROTO, &body))
            .await?;
        let _ = state_tx.send(SessionState::Authenticating);

        let driver = tokio::spawn(drive(
            reader,
            writer,
            writer_task,
            config,
            sequence,
            event_tx,
            state_tx,
            shutdown_rx,
        ));

        Ok(Session {
            events: event_rx,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            driver,
        })
    }

    /// Receive the next event, in wire arrival order.
    ///
    /// Returns `None` after the terminal [`SessionEvent::Closed`] has been
    /// consumed and the driver is gone.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Tear the session down and wait for the driver to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.driver).await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// Driver: read loop plus heartbeat child task, with shutdown handling.
#[allow(clippy::too_many_arguments)]
async fn drive<R>(
    reader: R,
    writer: WriterHandle,
    writer_task: JoinHandle<Result<()>>,
    config: SessionConfig,
    sequence: Arc<AtomicU32>,
    events: mpsc::Sender<SessionEvent>,
    state: watch::Sender<SessionState>,
    mut shutdown: oneshot::Receiver<()>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut heartbeat: Option<JoinHandle<()>> = None;

    let reason = tokio::select! {
        reason = run_session(
            reader,
            &writer,
            &config,
            &sequence,
            &events,
            &state,
            &mut heartbeat,
        ) => reason,
        _ = &mut shutdown => CloseReason::ShutDown,
    };

    if let Some(task) = heartbeat {
        task.abort();
    }
    writer_task.abort();

    let _ = state.send(SessionState::Closed);
    tracing::debug!(?reason, "session closed");
    let _ = events.send(SessionEvent::Closed(reason)).await;
}

/// Authenticating and Live phases of the read loop. Returns the close reason.
async fn run_session<R>(
    mut reader: R,
    writer: &WriterHandle,
    config: &SessionConfig,
    sequence: &Arc<AtomicU32>,
    events: &mpsc::Sender<SessionEvent>,
    state: &watch::Sender<SessionState>,
    heartbeat: &mut Option<JoinHandle<()>>,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    let mut frame_buffer = FrameBuffer::new();
    let mut buf = vec![0u8; 8 * 1024];
    let mut pending: Vec<Frame> = Vec::new();

    // Authenticating: wait for the auth reply under the timeout, ignoring
    // anything else the server sends early.
    let deadline = config.auth_timeout;
    let auth_outcome = timeout(deadline, async {
        loop {
            let frames = match read_frames(&mut reader, &mut frame_buffer, &mut buf).await {
                Ok(frames) => frames,
                Err(reason) => return Err(reason),
            };
            let mut reply = None;
            for frame in frames {
                if reply.is_some() {
                    // Frames behind the reply in the same read burst belong
                    // to the live phase.
                    pending.push(frame);
                } else if frame.op() == Opcode::AuthReply {
                    match AuthReply::from_body(frame.body()) {
                        Ok(decoded) => reply = Some(decoded),
                        Err(e) => {
                            tracing::error!("undecodable auth reply: {}", e);
                            return Err(CloseReason::ProtocolError);
                        }
                    }
                } else {
                    tracing::warn!(
                        opcode = frame.header.opcode,
                        "frame before auth reply, ignoring"
                    );
                }
            }
            if let Some(reply) = reply {
                return Ok(reply);
            }
        }
    })
    .await;

    let reply = match auth_outcome {
        Ok(Ok(reply)) => reply,
        Ok(Err(reason)) => return reason,
        Err(_) => return CloseReason::AuthTimeout,
    };

    if !reply.is_ok() {
        return CloseReason::AuthFailed(reply.code);
    }

    let _ = state.send(SessionState::Live);
    if events.send(SessionEvent::Authenticated).await.is_err() {
        return CloseReason::ShutDown;
    }

    *heartbeat = Some(spawn_heartbeat(
        writer.clone(),
        sequence.clone(),
        config.heartbeat_interval,
    ));

    // Live: dispatch frames in arrival order.
    for frame in pending.drain(..) {
        if let Some(reason) = dispatch_frame(frame, events).await {
            return reason;
        }
    }
    loop {
        let frames = match read_frames(&mut reader, &mut frame_buffer, &mut buf).await {
            Ok(frames) => frames,
            Err(reason) => return reason,
        };
        for frame in frames {
            if let Some(reason) = dispatch_frame(frame, events).await {
                return reason;
            }
        }
    }
}

/// One transport read, pushed through the frame buffer.
async fn read_frames<R>(
    reader: &mut R,
    frame_buffer: &mut FrameBuffer,
    buf: &mut [u8],
) -> std::result::Result<Vec<Frame>, CloseReason>
where
    R: AsyncRead + Unpin,
{
    let n = match reader.read(buf).await {
        Ok(0) => return Err(CloseReason::TransportClosed),
        Ok(n) => n,
        Err(e) => {
            tracing::error!("transport read failed: {}", e);
            return Err(CloseReason::TransportClosed);
        }
    };
    frame_buffer.push(&buf[..n]).map_err(|e| {
        tracing::error!("inbound stream desynchronized: {}", e);
        CloseReason::MalformedHeader(e.to_string())
    })
}

/// Dispatch one inbound frame. Returns `Some(reason)` when the frame is
/// terminal for the session.
async fn dispatch_frame(frame: Frame, events: &mpsc::Sender<SessionEvent>) -> Option<CloseReason> {
    match frame.op() {
        Opcode::HeartBeatReply => match HeartbeatReply::from_body(frame.body) {
            Ok(reply) => {
                if events
                    .send(SessionEvent::Heartbeat {
                        popularity: reply.popularity,
                    })
                    .await
                    .is_err()
                {
                    return Some(CloseReason::ShutDown);
                }
                None
            }
            Err(e) => {
                tracing::warn!("dropping undecodable heartbeat reply: {}", e);
                None
            }
        },
        Opcode::Cmd => {
            for event in expand_command(frame) {
                if events.send(event).await.is_err() {
                    return Some(CloseReason::ShutDown);
                }
            }
            None
        }
        Opcode::Error => {
            if events
                .send(SessionEvent::Fault(RoomcastError::ProtocolError))
                .await
                .is_err()
            {
                return Some(CloseReason::ShutDown);
            }
            Some(CloseReason::ProtocolError)
        }
        Opcode::AuthReply => {
            tracing::warn!("duplicate auth reply in live state, ignoring");
            None
        }
        other => {
            tracing::warn!(opcode = other.to_wire(), "unknown opcode, ignoring");
            None
        }
    }
}

/// Expand one Cmd frame into its logical messages and per-frame faults,
/// preserving wire order.
fn expand_command(frame: Frame) -> Vec<SessionEvent> {
    let encoding = match PayloadEncoding::from_proto(frame.proto_ver()) {
        Some(encoding) => encoding,
        None => {
            return vec![SessionEvent::Fault(RoomcastError::UnsupportedProto(
                frame.proto_ver(),
            ))];
        }
    };

    let header = frame.header;
    let payload = match encoding.decompress(frame.body) {
        Ok(payload) => payload,
        Err(e) => return vec![SessionEvent::Fault(e)],
    };

    if !encoding.is_batch() {
        return match CommandMessage::from_envelope(header, payload) {
            Ok(msg) => vec![SessionEvent::Command(msg)],
            Err(e) => vec![SessionEvent::Fault(e)],
        };
    }

    let batch = unpack_batch(payload);
    let parsed = batch.frames.len();
    let leftover = batch.leftover;

    let mut out = Vec::with_capacity(parsed + 1);
    for nested in batch.frames {
        match CommandMessage::from_envelope(nested.header, nested.body) {
            Ok(msg) => out.push(SessionEvent::Command(msg)),
            Err(e) => out.push(SessionEvent::Fault(e)),
        }
    }
    if leftover > 0 {
        out.push(SessionEvent::Fault(RoomcastError::TruncatedBatch {
            parsed,
            leftover,
        }));
    }
    out
}

/// Spawn the heartbeat timer task.
///
/// Ticks immediately, then every `interval`; each tick sends one empty-body
/// heartbeat frame through the writer. Stops on its own once the writer task
/// is gone.
fn spawn_heartbeat(
    writer: WriterHandle,
    sequence: Arc<AtomicU32>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let seq = sequence.fetch_add(1, Ordering::Relaxed);
            let frame = OutboundFrame::new(Opcode::HeartBeat, seq, HEARTBEAT_PROTO, b"");
            if writer.send(frame).await.is_err() {
                tracing::debug!("writer gone, heartbeat task stopping");
                return;
            }
        }
    })
}
