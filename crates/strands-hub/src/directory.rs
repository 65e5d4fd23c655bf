//! Identity, room and mailbox directories.
//!
//! All three live in one [`Directory`] so that every compound operation
//! (join, leave with host migration, board change) sees and mutates a
//! consistent snapshot. The directory itself does no locking; the
//! [`Registry`](crate::registry::Registry) serializes access to it.
//!
//! Room membership is stored only on the identity. Member lists and counts
//! are derived by scanning identities, so there is no second copy to drift.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use strands_protocol::{Credentials, RelayError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::mailbox::{Mailbox, RelayEvent};

pub type IdentityId = String;
pub type RoomId = String;

const SECRET_BYTES: usize = 16;

/// A pseudonymous player.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: IdentityId,
    pub secret: String,
    /// Reserved; never set by any command.
    pub display_name: String,
    pub room: Option<RoomId>,
    pub last_seen: Instant,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    /// `None` only while the room is being torn down.
    pub host: Option<IdentityId>,
    /// Opaque board payload; empty until a member sets one.
    pub board: String,
    /// Base64 display name chosen by the creator.
    pub name: Option<String>,
    /// Base64 password; joining requires an exact match.
    pub password: Option<String>,
}

impl Room {
    pub fn is_locked(&self) -> bool {
        self.password.is_some()
    }

    fn admits(&self, password: Option<&str>) -> bool {
        match &self.password {
            Some(expected) => password == Some(expected.as_str()),
            None => true,
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
}

/// What a leave did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The leaver was the last member and the room is gone.
    RoomDeleted(RoomId),
    /// The room lives on, possibly under a new host.
    Left { room: RoomId, new_host: Option<IdentityId> },
}

#[derive(Debug, Default)]
pub struct Directory {
    identities: HashMap<IdentityId, Identity>,
    rooms: HashMap<RoomId, Room>,
    mailboxes: HashMap<IdentityId, Mailbox>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Identities ──────────────────────────────────────────────────────

    /// Issue a fresh identity with a random secret.
    pub fn create_identity(&mut self) -> Identity {
        let id = Uuid::new_v4().simple().to_string();
        let secret = hex::encode(rand::rng().random::<[u8; SECRET_BYTES]>());
        let identity = Identity {
            id: id.clone(),
            secret,
            display_name: String::new(),
            room: None,
            last_seen: Instant::now(),
        };
        self.identities.insert(id.clone(), identity.clone());
        info!("Issued identity {id}");
        identity
    }

    /// Verify `credentials` and mark the identity as recently seen.
    pub fn authenticate(&mut self, credentials: &Credentials) -> Result<Identity, RelayError> {
        match self.identities.get_mut(&credentials.id) {
            Some(identity) if identity.secret == credentials.secret => {
                identity.last_seen = Instant::now();
                Ok(identity.clone())
            }
            _ => Err(RelayError::AuthFailed(credentials.id.clone())),
        }
    }

    pub fn identity(&self, id: &str) -> Option<&Identity> {
        self.identities.get(id)
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Forget identities that are in no room, have no mailbox and have not
    /// authenticated within `ttl` of `now`. Returns how many were dropped.
    pub fn reap_idle(&mut self, ttl: Duration, now: Instant) -> usize {
        let before = self.identities.len();
        let mailboxes = &self.mailboxes;
        self.identities.retain(|id, identity| {
            identity.room.is_some()
                || mailboxes.contains_key(id)
                || now.saturating_duration_since(identity.last_seen) < ttl
        });
        before - self.identities.len()
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Every room with its current member count.
    pub fn list_rooms(&self) -> impl Iterator<Item = (&Room, usize)> + '_ {
        self.rooms
            .values()
            .map(|room| (room, self.member_count(&room.id)))
    }

    pub fn members(&self, room: &str) -> Vec<IdentityId> {
        self.identities
            .values()
            .filter(|identity| identity.room.as_deref() == Some(room))
            .map(|identity| identity.id.clone())
            .collect()
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.identities
            .values()
            .filter(|identity| identity.room.as_deref() == Some(room))
            .count()
    }

    /// Create a room hosted by `host`, who becomes its first member after
    /// leaving any room it was already in.
    pub fn create_room(
        &mut self,
        host: &str,
        name: Option<String>,
        password: Option<String>,
    ) -> Result<RoomId, RelayError> {
        if !self.identities.contains_key(host) {
            return Err(RelayError::AuthFailed(host.to_string()));
        }
        self.leave(host);

        let id = Uuid::new_v4().simple().to_string();
        self.rooms.insert(
            id.clone(),
            Room {
                id: id.clone(),
                host: Some(host.to_string()),
                board: String::new(),
                name,
                password,
            },
        );
        if let Some(identity) = self.identities.get_mut(host) {
            identity.room = Some(id.clone());
        }
        info!("Room {id} created by {host}");
        Ok(id)
    }

    /// Move `id` into `room`, leaving its current room first. A locked room
    /// admits newcomers only with its exact password.
    pub fn join_room(
        &mut self,
        id: &str,
        room: &str,
        password: Option<&str>,
    ) -> Result<JoinOutcome, RelayError> {
        let target = self
            .rooms
            .get(room)
            .ok_or_else(|| RelayError::RoomNotFound(room.to_string()))?;
        let admitted = target.admits(password);
        let current = self
            .identities
            .get(id)
            .ok_or_else(|| RelayError::AuthFailed(id.to_string()))?
            .room
            .clone();
        if current.as_deref() == Some(room) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        if !admitted {
            return Err(RelayError::WrongPassword(room.to_string()));
        }
        if current.is_some() {
            self.leave(id);
        }

        if let Some(identity) = self.identities.get_mut(id) {
            identity.room = Some(room.to_string());
        }
        self.broadcast(room, Some(id), RelayEvent::PlayerJoined(id.to_string()));
        info!("{id} joined room {room}");
        Ok(JoinOutcome::Joined)
    }

    /// Take `id` out of its room, if any.
    ///
    /// The last member out deletes the room. A departing host hands the room
    /// to a remaining member, preferring one with a live mailbox, who alone
    /// is told `NEWHOST`. Every remaining member then hears `LEFT`.
    pub fn leave(&mut self, id: &str) -> Option<LeaveOutcome> {
        let room_id = self.identities.get_mut(id)?.room.take()?;
        let remaining = self.members(&room_id);

        if remaining.is_empty() {
            self.rooms.remove(&room_id);
            info!("Room {room_id} is empty, deleting");
            return Some(LeaveOutcome::RoomDeleted(room_id));
        }

        let mut new_host = None;
        if let Some(room) = self.rooms.get_mut(&room_id) {
            if room.host.as_deref() == Some(id) {
                let successor = remaining
                    .iter()
                    .find(|member| self.mailboxes.contains_key(*member))
                    .or_else(|| remaining.first())
                    .cloned();
                room.host = successor.clone();
                new_host = successor;
            }
        }

        if let Some(host) = &new_host {
            info!("Room {room_id} host moved from {id} to {host}");
            self.send(host, RelayEvent::NewHost);
        }
        for member in &remaining {
            self.send(member, RelayEvent::PlayerLeft(id.to_string()));
        }
        debug!("{id} left room {room_id}");
        Some(LeaveOutcome::Left {
            room: room_id,
            new_host,
        })
    }

    /// Replace the board of `id`'s room and tell the other members.
    pub fn set_board(&mut self, id: &str, payload: String) -> Result<(), RelayError> {
        let room_id = self.room_of(id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| RelayError::RoomNotFound(room_id.clone()))?;
        room.board = payload;
        self.broadcast(&room_id, Some(id), RelayEvent::BoardChanged);
        Ok(())
    }

    /// The board of `id`'s room.
    pub fn board_for(&self, id: &str) -> Result<String, RelayError> {
        let room_id = self.room_of(id)?;
        let room = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RelayError::RoomNotFound(room_id.clone()))?;
        if room.board.is_empty() {
            return Err(RelayError::NoBoard(room_id));
        }
        Ok(room.board.clone())
    }

    /// Ask the host of `id`'s room to publish its state on `id`'s behalf.
    pub fn request_host_state(&self, id: &str) -> Result<(), RelayError> {
        let room_id = self.room_of(id)?;
        let room = self
            .rooms
            .get(&room_id)
            .ok_or_else(|| RelayError::RoomNotFound(room_id.clone()))?;
        let host = room
            .host
            .as_deref()
            .filter(|host| self.mailboxes.contains_key(*host))
            .ok_or_else(|| RelayError::NoHost(room_id.clone()))?;
        self.send(
            host,
            RelayEvent::HostStateRequest {
                from: id.to_string(),
            },
        );
        Ok(())
    }

    /// Relay `event` from `id` to every other member of its room.
    pub fn broadcast_from(&self, id: &str, event: RelayEvent) -> Result<(), RelayError> {
        let room_id = self.room_of(id)?;
        if !self.rooms.contains_key(&room_id) {
            return Err(RelayError::RoomNotFound(room_id));
        }
        self.broadcast(&room_id, Some(id), event);
        Ok(())
    }

    /// Deliver an opaque payload to `target`'s mailbox.
    pub fn forward(&self, target: &str, payload: String) -> Result<(), RelayError> {
        if !self.mailboxes.contains_key(target) {
            return Err(RelayError::TargetUnavailable(target.to_string()));
        }
        self.send(target, RelayEvent::Forward(payload));
        Ok(())
    }

    fn room_of(&self, id: &str) -> Result<RoomId, RelayError> {
        self.identities
            .get(id)
            .and_then(|identity| identity.room.clone())
            .ok_or_else(|| RelayError::NotInRoom(id.to_string()))
    }

    fn broadcast(&self, room: &str, except: Option<&str>, event: RelayEvent) {
        for member in self.members(room) {
            if except != Some(member.as_str()) {
                self.send(&member, event.clone());
            }
        }
    }

    // ── Mailboxes ───────────────────────────────────────────────────────

    /// Queue `event` for `target`. Identities without a mailbox miss it.
    pub fn send(&self, target: &str, event: RelayEvent) -> bool {
        match self.mailboxes.get(target) {
            Some(mailbox) => mailbox.deliver(event),
            None => {
                debug!("Dropping {event:?} for unbound {target}");
                false
            }
        }
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.mailboxes.contains_key(id)
    }

    /// Connection that owns `id`'s mailbox, if bound.
    pub fn binding_owner(&self, id: &str) -> Option<&str> {
        self.mailboxes.get(id).map(Mailbox::owner)
    }

    /// Attach a mailbox to `id`. An existing binding is left in place and
    /// the new one is dropped.
    pub fn bind(&mut self, id: &str, mailbox: Mailbox) -> bool {
        if self.mailboxes.contains_key(id) {
            return false;
        }
        self.mailboxes.insert(id.to_string(), mailbox);
        true
    }

    /// Remove `id`'s mailbox if `owner` holds it. The idle clock restarts
    /// from the moment the identity goes offline.
    pub fn release(&mut self, id: &str, owner: &str) -> bool {
        if self.binding_owner(id) != Some(owner) {
            return false;
        }
        self.mailboxes.remove(id);
        if let Some(identity) = self.identities.get_mut(id) {
            identity.last_seen = Instant::now();
        }
        true
    }
}
