// Transport boundary
//
// The Domain hands each flushed batch to a Transport as one opaque payload.
// Sends are fire-and-forget: the call only queues the payload, and the
// outcome of the actual publish is logged by the publisher task.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{LinkError, Result};

pub trait Transport: Send {
    /// Queue one payload for the peer. Must not block.
    fn send(&mut self, payload: Vec<u8>) -> Result<()>;
}

/// Transport that forwards payloads into a channel.
///
/// The receiving half is drained either by a zenoh publisher task or, in
/// tests, directly into another Domain.
pub struct ChannelTransport {
    tx: UnboundedSender<Vec<u8>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        self.tx
            .send(payload)
            .map_err(|_| LinkError::Transport("peer channel closed".to_string()))
    }
}

/// Publish every queued payload on a zenoh publisher until the sending side
/// is dropped. Publish failures are logged, never retried.
pub fn spawn_publisher(
    publisher: zenoh::pubsub::Publisher<'static>,
    mut outbox: UnboundedReceiver<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = outbox.recv().await {
            let len = payload.len();
            match publisher.put(payload).await {
                Ok(()) => debug!("Sent {} bytes on {}", len, publisher.key_expr()),
                Err(e) => error!("Failed to publish {} bytes: {}", len, e),
            }
        }
        debug!("Publisher outbox closed");
    })
}
