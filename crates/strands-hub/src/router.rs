//! Hub - parses each inbound line, checks credentials and routes the command
//! to the directory or the board cache.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use strands_boards::{BoardSource, recent_dates};
use strands_protocol::{Command, Credentials, HandlerResult, RelayError, Reply};
use strands_transport::{Outbound, SessionHandler};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::directory::{Identity, IdentityId};
use crate::mailbox::RelayEvent;
use crate::reaper::spawn_reaper;
use crate::registry::Registry;

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Number of days listed by `BOARDSUMMARIES`, ending today
    pub summary_days: usize,
    /// Idle identities are forgotten after this long (None keeps them forever)
    pub identity_ttl: Option<Duration>,
    /// How often the idle reaper runs
    pub reap_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            summary_days: 30,
            identity_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            reap_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Per-connection state.
#[derive(Debug)]
pub struct RelaySession {
    client_id: String,
    outbound: Outbound,
    /// Identity most recently established by `HELLO` on this connection.
    identity: Option<IdentityId>,
}

impl RelaySession {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}

/// The relay hub.
pub struct Hub<B: BoardSource> {
    registry: Arc<Registry>,
    boards: Arc<B>,
    config: HubConfig,
}

impl<B: BoardSource> Hub<B> {
    pub fn new(config: HubConfig, boards: Arc<B>) -> Self {
        Self {
            registry: Registry::new(),
            boards,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Start the idle identity reaper, if an expiry is configured.
    pub fn start_reaper(&self) -> Option<JoinHandle<()>> {
        let ttl = self.config.identity_ttl?;
        info!(
            "Reaping identities idle for {}s every {}s",
            ttl.as_secs(),
            self.config.reap_interval.as_secs()
        );
        Some(spawn_reaper(
            Arc::clone(&self.registry),
            ttl,
            self.config.reap_interval,
        ))
    }

    /// Handle one inbound line, returning the direct replies in order.
    pub async fn dispatch(&self, session: &mut RelaySession, line: &str) -> HandlerResult {
        let command = Command::parse(line)?;
        debug!("{}: {}", session.client_id, command.verb());

        match command {
            Command::Hello(credentials) => self.hello(session, credentials),
            Command::Ping => Ok(vec![Reply::Pong]),
            Command::NewRoom {
                credentials,
                name,
                password,
            } => {
                let room = self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.create_room(&identity.id, name, password)
                })?;
                Ok(vec![Reply::NewRoom(room)])
            }
            Command::Rooms => {
                let mut replies: Vec<Reply> = self.registry.with(|dir| {
                    dir.list_rooms()
                        .map(|(room, members)| Reply::Room {
                            id: room.id.clone(),
                            members,
                            name: room.name.clone(),
                            locked: room.is_locked(),
                        })
                        .collect()
                });
                replies.push(Reply::End);
                Ok(replies)
            }
            Command::Join {
                credentials,
                room,
                password,
            } => {
                self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.join_room(&identity.id, &room, password.as_deref())
                })?;
                Ok(vec![Reply::Cool])
            }
            Command::Leave(credentials) => {
                self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.leave(&identity.id);
                    Ok::<_, RelayError>(())
                })?;
                Ok(vec![Reply::Cool])
            }
            Command::SetBoard {
                credentials,
                payload,
            } => {
                self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.set_board(&identity.id, payload)
                })?;
                Ok(vec![Reply::Cool])
            }
            Command::Board(credentials) => {
                let board = self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.board_for(&identity.id)
                })?;
                Ok(vec![Reply::Board(board)])
            }
            Command::GetState(credentials) => {
                self.registry.with(|dir| {
                    let identity = dir.authenticate(&credentials)?;
                    dir.request_host_state(&identity.id)
                })?;
                Ok(Vec::new())
            }
            Command::Guess { credentials, x, y } => {
                self.relay_to_room(&credentials, RelayEvent::GuessStart { x, y })
            }
            Command::EndGuess(credentials) => self.relay_to_room(&credentials, RelayEvent::GuessEnd),
            Command::Hint(credentials) => self.relay_to_room(&credentials, RelayEvent::HintRequested),
            Command::Forward {
                credentials,
                target,
                payload,
            } => {
                self.registry.with(|dir| {
                    dir.authenticate(&credentials)?;
                    dir.forward(&target, payload)
                })?;
                Ok(Vec::new())
            }
            Command::DownloadBoard { date } => match self.boards.payload(&date).await {
                Some(payload) => Ok(vec![Reply::Board(payload)]),
                None => Err(RelayError::BoardUnavailable(date)),
            },
            Command::BoardSummaries => Ok(self.board_summaries().await),
        }
    }

    fn hello(&self, session: &mut RelaySession, credentials: Option<Credentials>) -> HandlerResult {
        let identity: Identity = match &credentials {
            None => self.registry.with(|dir| dir.create_identity()),
            Some(credentials) => self.registry.with(|dir| dir.authenticate(credentials))?,
        };

        // Switching identity on one connection unwinds the previous one.
        if let Some(previous) = session.identity.take() {
            if previous != identity.id {
                self.registry.disconnect(&previous, &session.client_id);
            }
        }

        self.registry.bind_mailbox(&identity.id, &session.outbound);
        session.identity = Some(identity.id.clone());
        Ok(vec![Reply::Hello {
            id: identity.id,
            secret: identity.secret,
        }])
    }

    fn relay_to_room(&self, credentials: &Credentials, event: RelayEvent) -> HandlerResult {
        self.registry.with(|dir| {
            let identity = dir.authenticate(credentials)?;
            dir.broadcast_from(&identity.id, event)
        })?;
        Ok(Vec::new())
    }

    async fn board_summaries(&self) -> Vec<Reply> {
        let today = chrono::Local::now().date_naive();
        let mut replies = vec![Reply::Start];
        for date in recent_dates(today, self.config.summary_days) {
            match self.boards.summary(&date).await {
                Some(summary) => replies.push(Reply::BoardSummary {
                    date: summary.date,
                    clue: STANDARD.encode(summary.clue),
                    editor: STANDARD.encode(summary.editor),
                }),
                None => debug!("No summary for {date}"),
            }
        }
        replies.push(Reply::End);
        replies
    }
}

impl<B: BoardSource> SessionHandler for Hub<B> {
    type Session = RelaySession;

    fn open(&self, client_id: &str, outbound: Outbound) -> RelaySession {
        RelaySession {
            client_id: client_id.to_string(),
            outbound,
            identity: None,
        }
    }

    async fn handle_line(&self, session: &mut RelaySession, line: &str) -> Vec<Reply> {
        match self.dispatch(session, line).await {
            Ok(replies) => replies,
            Err(e) => {
                match &e {
                    RelayError::UnknownCommand(_) | RelayError::MalformedCommand { .. } => {
                        warn!("{}: {e}", session.client_id)
                    }
                    _ => debug!("{}: {e}", session.client_id),
                }
                vec![e.reply()]
            }
        }
    }

    fn close(&self, session: RelaySession) {
        if let Some(identity) = session.identity {
            self.registry.disconnect(&identity, &session.client_id);
        }
    }
}
