//! WebSocket transport server using Axum.
//!
//! Handles HTTP upgrade to WebSocket, the per-connection read loop and
//! socket writer, and hands every text frame to the relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::json;
use strands_protocol::Reply;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::Outbound;

/// Trait implemented by the relay to handle connections.
///
/// The transport opens one session per WebSocket connection, feeds it every
/// text frame in arrival order, and closes it exactly once when the socket
/// goes away.
pub trait SessionHandler: Send + Sync + 'static {
    /// Per-connection state owned by the read loop.
    type Session: Send + 'static;

    /// A connection was accepted. `outbound` writes to its socket.
    fn open(&self, client_id: &str, outbound: Outbound) -> Self::Session;

    /// Handle one inbound line and return the direct replies, in order.
    fn handle_line(
        &self,
        session: &mut Self::Session,
        line: &str,
    ) -> impl std::future::Future<Output = Vec<Reply>> + Send;

    /// The connection is gone; unwind whatever the session holds.
    fn close(&self, session: Self::Session);
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Log every inbound frame
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 8802,
            hostname: "0.0.0.0".into(),
            max_connections: Some(256),
            verbose_logging: false,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: SessionHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    /// Connected client count (for health check)
    client_count: Arc<AtomicUsize>,
}

/// The transport server - manages WebSocket connections.
pub struct TransportServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
    client_count: Arc<AtomicUsize>,
}

impl TransportServer {
    /// Start the transport server with the given session handler.
    pub async fn start<H: SessionHandler>(
        config: TransportConfig,
        handler: H,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_shared(config, Arc::new(handler)).await
    }

    /// Start the transport server with a handler that is also shared with
    /// other subsystems.
    pub async fn start_shared<H: SessionHandler>(
        config: TransportConfig,
        handler: Arc<H>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let client_count = Arc::new(AtomicUsize::new(0));

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            client_count: client_count.clone(),
        });

        let app = Router::new()
            .route("/", get(ws_upgrade_handler::<H>))
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Strands relay listening on ws://{}:{}/", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
            client_count,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of open WebSocket connections.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Strands transport server stopped");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: SessionHandler>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    if let Some(max) = state.config.max_connections {
        let current = state.client_count.load(Ordering::Relaxed);
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: SessionHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.client_count.load(Ordering::Relaxed),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_ws_connection<H: SessionHandler>(socket: WebSocket, state: Arc<AppState<H>>) {
    state.client_count.fetch_add(1, Ordering::Relaxed);

    let client_id = uuid::Uuid::new_v4().to_string();
    info!("Client connected: {client_id}");

    let (ws_tx, mut ws_rx) = socket.split();
    let (outbound, outbound_rx) = Outbound::channel(client_id.clone());
    let mut writer = tokio::spawn(write_loop(ws_tx, outbound_rx, client_id.clone()));

    let mut session = state.handler.open(&client_id, outbound.clone());

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if state.config.verbose_logging {
                            debug!("{client_id} <- {:?}", text.as_str());
                        }
                        let replies = state.handler.handle_line(&mut session, text.as_str()).await;
                        if send_all(&outbound, &replies).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        // Binary frames are a protocol violation; the connection stays open.
                        warn!("Binary frame rejected from {client_id}");
                        if outbound.send(&Reply::Invalid).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client disconnected: {client_id}");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {client_id}: {e}");
                        break;
                    }
                    // Ping/pong frames are answered by the websocket layer.
                    Some(Ok(_)) => {}
                }
            }

            // Writer exits only when a socket write fails.
            _ = &mut writer => {
                warn!("Socket writer for {client_id} stopped");
                break;
            }
        }
    }

    state.handler.close(session);
    drop(outbound);
    writer.abort();

    state.client_count.fetch_sub(1, Ordering::Relaxed);
    info!(
        "Client disconnected: {client_id} (total: {})",
        state.client_count.load(Ordering::Relaxed)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn send_all(outbound: &Outbound, replies: &[Reply]) -> Result<(), crate::ConnectionClosed> {
    for reply in replies {
        outbound.send(reply)?;
    }
    Ok(())
}

async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<String>,
    client_id: String,
) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = ws_tx.send(Message::Text(line.into())).await {
            warn!("Failed to write to {client_id}: {e}");
            return;
        }
    }
    let _ = ws_tx.close().await;
}
