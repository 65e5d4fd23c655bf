//! Strands relay hub
//!
//! Identities, rooms and per-identity mailboxes, plus the command router
//! that the transport hands every inbound line to.
//!
//! Each connected identity gets a mailbox and a dispatcher task that writes
//! relay events to that identity's own socket. Senders only ever push onto
//! unbounded queues, so one slow client never stalls another.

pub mod directory;
pub mod mailbox;
pub mod reaper;
pub mod registry;
pub mod router;

pub use directory::{Directory, Identity, IdentityId, JoinOutcome, LeaveOutcome, Room, RoomId};
pub use mailbox::{Mailbox, RelayEvent};
pub use reaper::spawn_reaper;
pub use registry::Registry;
pub use router::{Hub, HubConfig, RelaySession};
