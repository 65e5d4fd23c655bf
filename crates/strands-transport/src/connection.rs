//! Outbound handle for a single connection's socket.

use strands_protocol::Reply;
use thiserror::Error;
use tokio::sync::mpsc;

/// The socket writer for this connection has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Cloneable handle that queues frames for one connection's writer task.
///
/// Only the owning connection's writer drains the queue, so a slow socket
/// never stalls delivery to anyone else.
#[derive(Debug, Clone)]
pub struct Outbound {
    client_id: String,
    tx: mpsc::UnboundedSender<String>,
}

impl Outbound {
    /// Create a handle plus the receiving end its writer drains.
    pub fn channel(client_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                client_id: client_id.into(),
                tx,
            },
            rx,
        )
    }

    /// Id of the connection this handle writes to.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn send(&self, reply: &Reply) -> Result<(), ConnectionClosed> {
        self.tx.send(reply.to_line()).map_err(|_| ConnectionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
