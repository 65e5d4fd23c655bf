//! Registry - the single lock in front of the [`Directory`].
//!
//! Every request runs its whole check-and-mutate sequence inside one
//! [`Registry::with`] call. Relay events are pushed onto unbounded mailbox
//! queues while the lock is held, which never blocks.

use std::sync::Arc;

use parking_lot::Mutex;
use strands_transport::Outbound;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::directory::{Directory, LeaveOutcome};
use crate::mailbox::{Mailbox, run_dispatcher};

#[derive(Debug, Default)]
pub struct Registry {
    directory: Mutex<Directory>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `f` with exclusive access to the directory.
    pub fn with<R>(&self, f: impl FnOnce(&mut Directory) -> R) -> R {
        f(&mut self.directory.lock())
    }

    /// Give `identity` a mailbox drained into `outbound`, unless some
    /// connection already holds one. Returns whether a binding was created.
    pub fn bind_mailbox(self: &Arc<Self>, identity: &str, outbound: &Outbound) -> bool {
        let mut dir = self.directory.lock();
        if dir.is_bound(identity) {
            debug!(
                "{} attached to {identity}, bound elsewhere",
                outbound.client_id()
            );
            return false;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(run_dispatcher(
            Arc::clone(self),
            identity.to_string(),
            rx,
            outbound.clone(),
        ));
        let mailbox = Mailbox::new(outbound.client_id(), tx).with_dispatcher(dispatcher.abort_handle());
        dir.bind(identity, mailbox)
    }

    /// Unwind `identity` on behalf of connection `client_id`: leave its room
    /// and drop its mailbox. An identity bound to another connection is left
    /// alone; an unbound one still leaves its room.
    pub fn disconnect(&self, identity: &str, client_id: &str) -> Option<LeaveOutcome> {
        let mut dir = self.directory.lock();
        let owned = match dir.binding_owner(identity) {
            Some(owner) if owner != client_id => return None,
            owner => owner.is_some(),
        };
        if owned {
            dir.release(identity, client_id);
        }
        let outcome = dir.leave(identity);
        info!("{identity} disconnected");
        outcome
    }
}
