//! End-to-end integration tests - real WebSocket connections against the
//! running relay, covering the line protocol, relay fan-out and disconnect
//! handling.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use strands_boards::{BoardCache, BoardCacheConfig};
use strands_hub::{Hub, HubConfig};
use strands_transport::{TransportConfig, TransportServer};
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const CACHED_DATE: &str = "2024-06-01";
const CACHED_BOARD: &str = "eyJwcmludERhdGUiOiIyMDI0LTA2LTAxIn0=";

/// Write a board cache file holding one day, so no test touches the network.
fn seeded_cache(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("boards.json");
    let file = serde_json::json!({
        "Summaries": {
            CACHED_DATE: { "printDate": CACHED_DATE, "clue": "Ahoy", "editor": "Tracy Bennett" }
        },
        "Boards": { CACHED_DATE: CACHED_BOARD }
    });
    std::fs::write(&path, file.to_string()).unwrap();
    path
}

/// Start a relay on an OS-assigned port.
async fn start_test_server(max_connections: usize) -> u16 {
    let dir = TempDir::new().unwrap();
    let cache_path = seeded_cache(&dir);
    // Leak the TempDir so it persists for the test duration
    Box::leak(Box::new(dir));

    let boards = BoardCache::open(&BoardCacheConfig {
        path: Some(cache_path),
        // Unroutable; every uncached date is a miss.
        base_url: "http://127.0.0.1:9".into(),
    });
    let hub = Hub::new(HubConfig::default(), Arc::new(boards));

    let config = TransportConfig {
        port: 0, // OS-assigned
        hostname: "127.0.0.1".into(),
        max_connections: Some(max_connections),
        verbose_logging: false,
    };

    let transport = TransportServer::start(config, hub).await.unwrap();
    let port = transport.port();

    // Leak the transport to keep it running for the test
    Box::leak(Box::new(transport));

    port
}

async fn connect(port: u16) -> Ws {
    let url = format!("ws://127.0.0.1:{port}/");
    let (ws, _) = connect_async(&url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut Ws, line: &str) {
    ws.send(Message::Text(line.into())).await.unwrap();
}

async fn recv(ws: &mut Ws) -> String {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timeout waiting for frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if msg.is_text() {
            return msg.into_text().unwrap().as_str().to_owned();
        }
    }
}

async fn request(ws: &mut Ws, line: &str) -> String {
    send(ws, line).await;
    recv(ws).await
}

/// `HELLO` and split the reply into (id, secret).
async fn hello(ws: &mut Ws) -> (String, String) {
    let reply = request(ws, "HELLO").await;
    let fields: Vec<&str> = reply.trim_end().split(' ').collect();
    assert_eq!(fields.len(), 3, "unexpected HELLO reply: {reply:?}");
    assert_eq!(fields[0], "HELLO");
    (fields[1].to_string(), fields[2].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hello_new_room_join_scenario() {
    let port = start_test_server(16).await;

    let mut client1 = connect(port).await;
    let (id1, key1) = hello(&mut client1).await;

    let reply = request(&mut client1, &format!("NEWROOM {id1} {key1}")).await;
    let room = reply
        .strip_prefix("NEWROOM ")
        .and_then(|r| r.strip_suffix('\n'))
        .expect("NEWROOM reply")
        .to_string();

    let mut client2 = connect(port).await;
    let (id2, key2) = hello(&mut client2).await;

    let reply = request(&mut client2, &format!("JOIN {id2} {key2} {room}\n")).await;
    assert_eq!(reply, "COOL\n");
    assert_eq!(recv(&mut client1).await, format!("JOINED {id2}\n"));

    send(&mut client2, "ROOMS").await;
    assert_eq!(recv(&mut client2).await, format!("ROOM {room} 2 NONE\n"));
    assert_eq!(recv(&mut client2).await, "END\n");
}

#[tokio::test]
async fn named_room_with_password() {
    let port = start_test_server(16).await;

    let mut host = connect(port).await;
    let (id1, key1) = hello(&mut host).await;
    let reply = request(&mut host, &format!("NEWROOM {id1} {key1} bmljaw== cGFzcw==")).await;
    let room = reply
        .strip_prefix("NEWROOM ")
        .and_then(|r| r.strip_suffix('\n'))
        .expect("NEWROOM reply")
        .to_string();

    let mut guest = connect(port).await;
    let (id2, key2) = hello(&mut guest).await;
    let reply = request(&mut guest, &format!("JOIN {id2} {key2} {room} d3Jvbmc=")).await;
    assert_eq!(reply, "NO\n");
    let reply = request(&mut guest, &format!("JOIN {id2} {key2} {room} cGFzcw==")).await;
    assert_eq!(reply, "COOL\n");
    assert_eq!(recv(&mut host).await, format!("JOINED {id2}\n"));

    send(&mut guest, "ROOMS").await;
    assert_eq!(
        recv(&mut guest).await,
        format!("ROOM {room} 2 bmljaw== PASSWORD\n")
    );
    assert_eq!(recv(&mut guest).await, "END\n");
}

#[tokio::test]
async fn ping_and_invalid_lines() {
    let port = start_test_server(16).await;
    let mut ws = connect(port).await;

    assert_eq!(request(&mut ws, "PING").await, "PONG\n");
    assert_eq!(request(&mut ws, "NOTACOMMAND").await, "INVALID\n");
    assert_eq!(request(&mut ws, "NEWROOM nobody nothing").await, "INVALID\n");
}

#[tokio::test]
async fn binary_frame_is_invalid_but_connection_survives() {
    let port = start_test_server(16).await;
    let mut ws = connect(port).await;

    ws.send(Message::Binary(vec![0xde, 0xad].into())).await.unwrap();
    assert_eq!(recv(&mut ws).await, "INVALID\n");
    assert_eq!(request(&mut ws, "PING").await, "PONG\n");
}

#[tokio::test]
async fn set_board_reaches_other_members() {
    let port = start_test_server(16).await;
    let mut host = connect(port).await;
    let mut guest = connect(port).await;
    let (hid, hkey) = hello(&mut host).await;
    let (gid, gkey) = hello(&mut guest).await;

    let room = request(&mut host, &format!("NEWROOM {hid} {hkey}")).await;
    let room = room.trim_end().trim_start_matches("NEWROOM ").to_string();
    assert_eq!(request(&mut guest, &format!("JOIN {gid} {gkey} {room}")).await, "COOL\n");
    recv(&mut host).await;

    let reply = request(&mut host, &format!("SETBOARD {hid} {hkey} QUJDREVG")).await;
    assert_eq!(reply, "COOL\n");
    assert_eq!(recv(&mut guest).await, "BOARD QUJDREVG\n");
    assert_eq!(request(&mut guest, &format!("BOARD {gid} {gkey}")).await, "BOARD QUJDREVG\n");

    send(&mut guest, &format!("FORWARD {gid} {gkey} {hid} TWORD plane\n")).await;
    assert_eq!(recv(&mut host).await, "TWORD plane");
}

#[tokio::test]
async fn disconnect_runs_leave_protocol() {
    let port = start_test_server(16).await;
    let mut host = connect(port).await;
    let mut guest = connect(port).await;
    let (hid, hkey) = hello(&mut host).await;
    let (gid, gkey) = hello(&mut guest).await;

    let room = request(&mut host, &format!("NEWROOM {hid} {hkey}")).await;
    let room = room.trim_end().trim_start_matches("NEWROOM ").to_string();
    request(&mut guest, &format!("JOIN {gid} {gkey} {room}")).await;
    recv(&mut host).await;

    host.close(None).await.unwrap();
    drop(host);

    let mut events = vec![recv(&mut guest).await, recv(&mut guest).await];
    events.sort();
    assert_eq!(events, vec![format!("LEFT {hid}\n"), "NEWHOST\n".to_string()]);

    let reply = request(&mut guest, &format!("FORWARD {gid} {gkey} {hid} anyone there?")).await;
    assert_eq!(reply, "NO\n");
}

#[tokio::test]
async fn download_board_from_cache() {
    let port = start_test_server(16).await;
    let mut ws = connect(port).await;

    let reply = request(&mut ws, &format!("DLBOARD {CACHED_DATE}")).await;
    assert_eq!(reply, format!("BOARD {CACHED_BOARD}\n"));

    assert_eq!(request(&mut ws, "DLBOARD someone not-a-date").await, "NO\n");
    assert_eq!(request(&mut ws, "DLBOARD").await, "INVALID\n");
}

#[tokio::test]
async fn health_endpoint_works() {
    let port = start_test_server(16).await;
    let _ws = connect(port).await;

    let url = format!("http://127.0.0.1:{port}/health");
    let resp = reqwest::get(&url).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn connections_beyond_limit_are_refused() {
    let port = start_test_server(1).await;
    let mut first = connect(port).await;
    // One round trip guarantees the first connection is counted.
    assert_eq!(request(&mut first, "PING").await, "PONG\n");

    let url = format!("ws://127.0.0.1:{port}/ws");
    assert!(connect_async(&url).await.is_err());
}
