//! Relay mailboxes - one inbound event queue per connected identity, drained
//! by a dispatcher task that writes to that identity's own socket.

use std::sync::Arc;

use strands_protocol::Reply;
use strands_transport::Outbound;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::directory::IdentityId;
use crate::registry::Registry;

/// Events one identity can deliver to another through the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    GuessStart { x: i64, y: i64 },
    GuessEnd,
    HintRequested,
    /// The room board changed; the recipient re-reads it on delivery.
    BoardChanged,
    HostStateRequest { from: IdentityId },
    Forward(String),
    NewHost,
    PlayerJoined(IdentityId),
    PlayerLeft(IdentityId),
}

impl RelayEvent {
    /// The line this event becomes on `recipient`'s socket. A board change
    /// is resolved against the directory at delivery time.
    fn render(self, registry: &Registry, recipient: &str) -> Reply {
        match self {
            Self::GuessStart { x, y } => Reply::Guess { x, y },
            Self::GuessEnd => Reply::EndGuess,
            Self::HintRequested => Reply::Hint,
            Self::BoardChanged => registry
                .with(|dir| dir.board_for(recipient))
                .map(Reply::Board)
                .unwrap_or_else(|e| e.reply()),
            Self::HostStateRequest { from } => Reply::HostState(from),
            Self::Forward(payload) => Reply::Raw(payload),
            Self::NewHost => Reply::NewHost,
            Self::PlayerJoined(id) => Reply::Joined(id),
            Self::PlayerLeft(id) => Reply::Left(id),
        }
    }
}

/// A live mailbox binding for one identity.
///
/// Dropping the binding closes the queue and aborts its dispatcher.
#[derive(Debug)]
pub struct Mailbox {
    /// Connection that owns this binding.
    owner: String,
    tx: mpsc::UnboundedSender<RelayEvent>,
    dispatcher: Option<AbortHandle>,
}

impl Mailbox {
    pub fn new(owner: impl Into<String>, tx: mpsc::UnboundedSender<RelayEvent>) -> Self {
        Self {
            owner: owner.into(),
            tx,
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(mut self, handle: AbortHandle) -> Self {
        self.dispatcher = Some(handle);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Queue an event. Never blocks; the queue is unbounded.
    pub fn deliver(&self, event: RelayEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.take() {
            handle.abort();
        }
    }
}

/// Drain one identity's mailbox into its socket until either side closes.
pub(crate) async fn run_dispatcher(
    registry: Arc<Registry>,
    identity: IdentityId,
    mut rx: mpsc::UnboundedReceiver<RelayEvent>,
    outbound: Outbound,
) {
    while let Some(event) = rx.recv().await {
        let reply = event.render(&registry, &identity);
        if outbound.send(&reply).is_err() {
            debug!("Mailbox for {identity} lost its socket");
            break;
        }
    }
}
