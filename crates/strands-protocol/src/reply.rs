//! Outbound lines - direct replies and relay-originated events.

use std::fmt;

use crate::verbs::Verbs;

/// One outbound frame. Every variant renders as a single newline-terminated
/// line except [`Reply::Raw`], which is written verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    // ── Direct replies ──────────────────────────────────────────────────
    Hello { id: String, secret: String },
    NewRoom(String),
    /// One `ROOMS` entry; `name` is base64 as supplied by the creator.
    Room { id: String, members: usize, name: Option<String>, locked: bool },
    Board(String),
    BoardSummary { date: String, clue: String, editor: String },
    Pong,

    // ── Generic acks ────────────────────────────────────────────────────
    Cool,
    No,
    Invalid,
    Start,
    End,

    // ── Relay events ────────────────────────────────────────────────────
    NewHost,
    Joined(String),
    Left(String),
    Guess { x: i64, y: i64 },
    EndGuess,
    Hint,
    HostState(String),
    /// Forwarded payload, delivered byte-for-byte.
    Raw(String),
}

impl Reply {
    /// Render the frame text.
    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello { id, secret } => writeln!(f, "{} {id} {secret}", Verbs::HELLO),
            Self::NewRoom(room) => writeln!(f, "{} {room}", Verbs::NEW_ROOM),
            Self::Room { id, members, name, locked } => {
                let name = name.as_deref().unwrap_or(Verbs::NO_NAME);
                if *locked {
                    writeln!(f, "{} {id} {members} {name} {}", Verbs::ROOM, Verbs::PASSWORD)
                } else {
                    writeln!(f, "{} {id} {members} {name}", Verbs::ROOM)
                }
            }
            Self::Board(payload) => writeln!(f, "{} {payload}", Verbs::BOARD),
            Self::BoardSummary { date, clue, editor } => {
                writeln!(f, "{} {date} {clue} {editor}", Verbs::BOARD_SUMMARY)
            }
            Self::Pong => writeln!(f, "{}", Verbs::PONG),
            Self::Cool => writeln!(f, "{}", Verbs::COOL),
            Self::No => writeln!(f, "{}", Verbs::NO),
            Self::Invalid => writeln!(f, "{}", Verbs::INVALID),
            Self::Start => writeln!(f, "{}", Verbs::START),
            Self::End => writeln!(f, "{}", Verbs::END),
            Self::NewHost => writeln!(f, "{}", Verbs::NEW_HOST),
            Self::Joined(id) => writeln!(f, "{} {id}", Verbs::JOINED),
            Self::Left(id) => writeln!(f, "{} {id}", Verbs::LEFT),
            Self::Guess { x, y } => writeln!(f, "{} {x} {y}", Verbs::GUESS),
            Self::EndGuess => writeln!(f, "{}", Verbs::END_GUESS),
            Self::Hint => writeln!(f, "{}", Verbs::HINT),
            Self::HostState(src) => writeln!(f, "{} {src}", Verbs::HOST_STATE),
            Self::Raw(payload) => f.write_str(payload),
        }
    }
}
