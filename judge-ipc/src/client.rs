// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Owns the socket on the slave side: a reader task that decodes frames
//! and hands them to the caller, and a writer task that drains an
//! unbounded queue in FIFO order. One background task consumes a
//! `tokio::sync::mpsc` channel so the call site never blocks, adapted
//! from request/response RPC to fire-and-forget messages.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use judge_protocol::Message;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::{CodecError, MessageCodec};

/// A connected master<->slave message stream.
///
/// `queue_message` never blocks: it pushes onto an unbounded channel
/// drained by a dedicated writer task, so a slow or wedged master can
/// never make the executor or reader stall.
pub struct MessageClient {
    outbound: mpsc::UnboundedSender<Message>,
    writer_task: JoinHandle<()>,
    reader_task: JoinHandle<()>,
}

/// One inbound event: a decoded message, or a frame that failed to
/// decode. The reader task stops after the first decode error (a slave
/// that can't trust the framing can't trust anything after it either),
/// so at most one `Err` is ever delivered, always last.
pub type InboundResult = Result<Message, CodecError>;

impl MessageClient {
    /// Connects to the master at `addr` (the slave is always the
    /// connecting party) and spawns the reader/writer tasks.
    ///
    /// Returns the client plus a channel that receives every inbound
    /// message in arrival order, realized as a channel rather than a
    /// callback so the caller can `select!` on it alongside other events
    /// (notably the idle timer). A decode failure is delivered as `Err`
    /// rather than silently closing the channel, so the caller can tell
    /// a malformed frame (which should end the slave with
    /// `SlaveDiedWithUnknownError`) apart from an ordinary disconnect.
    pub async fn connect(addr: SocketAddr) -> std::io::Result<(Self, mpsc::UnboundedReceiver<InboundResult>)> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream))
    }

    /// Builds a client directly from an already-connected stream, bypassing
    /// `connect`'s own dialing. Exposed so callers that accept rather than
    /// dial (tests driving a slave against a mock master) can reuse the
    /// same reader/writer task plumbing.
    pub fn from_stream(stream: TcpStream) -> (Self, mpsc::UnboundedReceiver<InboundResult>) {
        let framed = Framed::new(stream, MessageCodec::default());
        let (mut sink, mut source) = framed.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundResult>();

        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(err) = sink.send(message).await {
                    warn!(%err, "message client: write failed, stopping writer");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_task = tokio::spawn(async move {
            loop {
                match source.next().await {
                    Some(Ok(message)) => {
                        debug!(kind = ?message, "message client: received frame");
                        if inbound_tx.send(Ok(message)).is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(%err, "message client: malformed frame");
                        let _ = inbound_tx.send(Err(err));
                        break;
                    }
                    None => break,
                }
            }
        });

        (MessageClient { outbound: outbound_tx, writer_task, reader_task }, inbound_rx)
    }

    /// Enqueues `message` for delivery. Never blocks; silently drops if the
    /// writer has already stopped (the socket is gone either way).
    pub fn queue_message(&self, message: Message) {
        let _ = self.outbound.send(message);
    }

    /// Flushes queued outbound writes with a bounded deadline, then closes
    /// the socket.
    pub async fn stop(self, deadline: Duration) {
        drop(self.outbound);
        if tokio::time::timeout(deadline, self.writer_task).await.is_err() {
            warn!("message client: flush deadline exceeded, closing socket anyway");
        }
        self.reader_task.abort();
    }
}
