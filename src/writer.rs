//! Dedicated writer task serializing outbound frames.
//!
//! The session and the heartbeat timer both send frames on the same
//! connection. Instead of sharing the write half behind a mutex, frames go
//! through an mpsc channel into a single task that owns the write half — the
//! one mutual-exclusion region for "send frame", so partial writes can never
//! interleave.
//!
//! ```text
//! session (auth) ──┐
//!                  ├─► mpsc::Sender<OutboundFrame> ─► writer task ─► transport
//! heartbeat timer ─┘
//! ```

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, RoomcastError};
use crate::protocol::{build_frame, Opcode};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A frame ready to be written to the transport.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Complete encoded frame (header + body).
    pub bytes: Bytes,
}

impl OutboundFrame {
    /// Encode a frame for sending.
    pub fn new(opcode: Opcode, sequence: u32, proto_ver: u16, body: &[u8]) -> Self {
        Self {
            bytes: Bytes::from(build_frame(opcode, sequence, proto_ver, body)),
        }
    }

    /// Total encoded size.
    #[inline]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Handle for sending frames to the writer task.
///
/// Cheaply cloneable; one clone lives in the heartbeat task.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

impl WriterHandle {
    /// Send a frame to the writer task.
    ///
    /// Fails with [`RoomcastError::TransportClosed`] once the writer task has
    /// shut down.
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| RoomcastError::TransportClosed)
    }
}

/// Spawn the writer task and return a handle for sending frames.
///
/// The task exits cleanly when every [`WriterHandle`] clone is dropped, and
/// with an error when the transport rejects a write.
pub fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives frames and writes them whole.
async fn writer_loop<W>(mut rx: mpsc::Receiver<OutboundFrame>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&frame.bytes).await?;

        // Drain whatever queued up while we were writing before flushing
        while let Ok(next) = rx.try_recv() {
            writer.write_all(&next.bytes).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}
