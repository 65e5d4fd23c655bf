//! Inbound command tokenizer and parser.
//!
//! Wire shape (one text frame per command):
//!   COMMAND [ID SECRET [REST]]
//!
//! A line is split on single spaces into at most four fields. `REST` is left
//! intact except by the commands that need more structure from it: `GUESS`
//! splits it into coordinates, `FORWARD` splits it once into a target and an
//! opaque payload, `NEWROOM` and `JOIN` split it once into a name or room id
//! and an optional password. One trailing line terminator is stripped from the last
//! field only.

use crate::error::RelayError;
use crate::verbs::Verbs;

const MAX_FIELDS: usize = 4;

/// An identity id plus the secret that proves control of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }
}

/// A fully parsed inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `HELLO` issues a new identity, `HELLO <id> <secret>` resumes one.
    Hello(Option<Credentials>),
    Ping,
    /// `NEWROOM <id> <secret> [<name> [<password>]]`, both base64 and opaque.
    NewRoom { credentials: Credentials, name: Option<String>, password: Option<String> },
    Rooms,
    Join { credentials: Credentials, room: String, password: Option<String> },
    Leave(Credentials),
    SetBoard { credentials: Credentials, payload: String },
    Board(Credentials),
    GetState(Credentials),
    Guess { credentials: Credentials, x: i64, y: i64 },
    EndGuess(Credentials),
    Hint(Credentials),
    Forward { credentials: Credentials, target: String, payload: String },
    DownloadBoard { date: String },
    BoardSummaries,
}

impl Command {
    /// Parse one inbound line.
    pub fn parse(line: &str) -> Result<Self, RelayError> {
        let fields = tokenize(line);
        let verb = fields.first().copied().unwrap_or_default();

        match verb {
            Verbs::HELLO => {
                if fields.len() == 1 {
                    Ok(Self::Hello(None))
                } else {
                    Ok(Self::Hello(Some(credentials(&fields, Verbs::HELLO)?)))
                }
            }
            Verbs::PING => Ok(Self::Ping),
            Verbs::NEW_ROOM => {
                let credentials = credentials(&fields, Verbs::NEW_ROOM)?;
                let (name, password) = split_optional(fields.get(3).copied().unwrap_or_default());
                Ok(Self::NewRoom {
                    credentials,
                    name: name.map(str::to_string),
                    password: password.map(str::to_string),
                })
            }
            Verbs::ROOMS => Ok(Self::Rooms),
            Verbs::JOIN => {
                let credentials = credentials(&fields, Verbs::JOIN)?;
                let (room, password) = split_optional(rest(&fields, Verbs::JOIN)?);
                let room = room.ok_or(RelayError::malformed(Verbs::JOIN, "missing room"))?;
                Ok(Self::Join {
                    credentials,
                    room: room.to_string(),
                    password: password.map(str::to_string),
                })
            }
            Verbs::LEAVE => Ok(Self::Leave(credentials(&fields, Verbs::LEAVE)?)),
            Verbs::SET_BOARD => Ok(Self::SetBoard {
                credentials: credentials(&fields, Verbs::SET_BOARD)?,
                payload: rest(&fields, Verbs::SET_BOARD)?.to_string(),
            }),
            Verbs::BOARD => Ok(Self::Board(credentials(&fields, Verbs::BOARD)?)),
            Verbs::GET_STATE => Ok(Self::GetState(credentials(&fields, Verbs::GET_STATE)?)),
            Verbs::GUESS => {
                let credentials = credentials(&fields, Verbs::GUESS)?;
                let (x, y) = coordinates(rest(&fields, Verbs::GUESS)?)?;
                Ok(Self::Guess { credentials, x, y })
            }
            Verbs::END_GUESS => Ok(Self::EndGuess(credentials(&fields, Verbs::END_GUESS)?)),
            Verbs::HINT => Ok(Self::Hint(credentials(&fields, Verbs::HINT)?)),
            Verbs::FORWARD => {
                let credentials = credentials(&fields, Verbs::FORWARD)?;
                let (target, payload) = rest(&fields, Verbs::FORWARD)?
                    .split_once(' ')
                    .ok_or(RelayError::malformed(Verbs::FORWARD, "missing payload"))?;
                if target.is_empty() {
                    return Err(RelayError::malformed(Verbs::FORWARD, "empty target"));
                }
                Ok(Self::Forward {
                    credentials,
                    target: target.to_string(),
                    payload: payload.to_string(),
                })
            }
            Verbs::DOWNLOAD_BOARD => {
                // Clients send `DLBOARD <date>`; the documented form carries an
                // id first. Either way the date is the last field.
                let date = fields[1..]
                    .last()
                    .copied()
                    .filter(|d| !d.is_empty())
                    .ok_or(RelayError::malformed(Verbs::DOWNLOAD_BOARD, "missing date"))?;
                Ok(Self::DownloadBoard {
                    date: date.to_string(),
                })
            }
            Verbs::BOARD_SUMMARIES => Ok(Self::BoardSummaries),
            other => Err(RelayError::UnknownCommand(other.to_string())),
        }
    }

    /// The verb this command was parsed from.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Hello(_) => Verbs::HELLO,
            Self::Ping => Verbs::PING,
            Self::NewRoom { .. } => Verbs::NEW_ROOM,
            Self::Rooms => Verbs::ROOMS,
            Self::Join { .. } => Verbs::JOIN,
            Self::Leave(_) => Verbs::LEAVE,
            Self::SetBoard { .. } => Verbs::SET_BOARD,
            Self::Board(_) => Verbs::BOARD,
            Self::GetState(_) => Verbs::GET_STATE,
            Self::Guess { .. } => Verbs::GUESS,
            Self::EndGuess(_) => Verbs::END_GUESS,
            Self::Hint(_) => Verbs::HINT,
            Self::Forward { .. } => Verbs::FORWARD,
            Self::DownloadBoard { .. } => Verbs::DOWNLOAD_BOARD,
            Self::BoardSummaries => Verbs::BOARD_SUMMARIES,
        }
    }
}

/// Split a line into at most four fields, stripping one trailing line
/// terminator from the last field.
pub fn tokenize(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.splitn(MAX_FIELDS, ' ').collect();
    if let Some(last) = fields.last_mut() {
        *last = strip_terminator(last);
    }
    fields
}

fn strip_terminator(field: &str) -> &str {
    field
        .strip_suffix("\r\n")
        .or_else(|| field.strip_suffix('\n'))
        .unwrap_or(field)
}

fn credentials(fields: &[&str], verb: &'static str) -> Result<Credentials, RelayError> {
    match (fields.get(1), fields.get(2)) {
        (Some(id), Some(secret)) => Ok(Credentials::new(*id, *secret)),
        _ => Err(RelayError::malformed(verb, "missing credentials")),
    }
}

fn rest<'a>(fields: &[&'a str], verb: &'static str) -> Result<&'a str, RelayError> {
    fields
        .get(3)
        .copied()
        .filter(|r| !r.is_empty())
        .ok_or(RelayError::malformed(verb, "missing argument"))
}

/// Split `rest` once on a space into two optional, non-empty parts.
fn split_optional(rest: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(s: &str) -> Option<&str> {
        Some(s).filter(|s| !s.is_empty())
    }
    match rest.split_once(' ') {
        Some((first, second)) => (non_empty(first), non_empty(second)),
        None => (non_empty(rest), None),
    }
}

fn coordinates(rest: &str) -> Result<(i64, i64), RelayError> {
    let mut parts = rest.split_whitespace();
    let mut next = || {
        parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .ok_or(RelayError::malformed(Verbs::GUESS, "bad coordinates"))
    };
    let x = next()?;
    let y = next()?;
    Ok((x, y))
}
