//! Relay error taxonomy and its mapping onto wire replies.

use thiserror::Error;

use crate::reply::Reply;

/// Everything a single request can fail with.
///
/// None of these are fatal to the connection; the router turns them into
/// one reply line via [`RelayError::reply`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("malformed {verb} command: {reason}")]
    MalformedCommand { verb: &'static str, reason: &'static str },

    #[error("authentication failed for identity {0}")]
    AuthFailed(String),

    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("wrong password for room {0}")]
    WrongPassword(String),

    #[error("target not connected: {0}")]
    TargetUnavailable(String),

    #[error("identity {0} is not in a room")]
    NotInRoom(String),

    #[error("room {0} has no board")]
    NoBoard(String),

    #[error("room {0} has no reachable host")]
    NoHost(String),

    #[error("board unavailable for {0}")]
    BoardUnavailable(String),
}

impl RelayError {
    pub fn malformed(verb: &'static str, reason: &'static str) -> Self {
        Self::MalformedCommand { verb, reason }
    }

    /// The reply a client sees for this error.
    ///
    /// The split between `INVALID` and `NO` is part of the wire contract
    /// (clients branch on it), including the precondition cases that look
    /// alike: acting while not in a room is `INVALID`, reading an empty
    /// board is `NO`.
    pub fn reply(&self) -> Reply {
        match self {
            Self::UnknownCommand(_)
            | Self::MalformedCommand { .. }
            | Self::AuthFailed(_)
            | Self::NotInRoom(_) => Reply::Invalid,
            Self::RoomNotFound(_)
            | Self::WrongPassword(_)
            | Self::TargetUnavailable(_)
            | Self::NoBoard(_)
            | Self::NoHost(_)
            | Self::BoardUnavailable(_) => Reply::No,
        }
    }
}
