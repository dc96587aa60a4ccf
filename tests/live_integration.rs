//! Integration tests for the live chat socket.
//!
//! Each test spins up an Axum WebSocket server on a random port and drives
//! `LiveSocket` against it, including dropped connections and refused ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use botflow::config::{LiveConfig, ReconnectPolicy};
use botflow::error::LiveError;
use botflow::live::{ConnectionState, LiveEventKind, LiveSocket};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const PAGE: &str = "whatsapp-1026";

#[derive(Clone)]
struct Hub {
    connections: Arc<AtomicUsize>,
    pages: Arc<Mutex<Vec<String>>>,
    received: mpsc::UnboundedSender<String>,
    /// Close the first connection right after its greeting.
    drop_first: bool,
    /// Follow the greeting with an undecodable frame and a second event.
    send_garbage: bool,
}

fn event_json(n: usize) -> Value {
    json!({
        "type": "message",
        "pageId": PAGE,
        "senderId": "519",
        "data": {"n": n},
        "timestamp": 1_735_725_600_000_i64 + n as i64
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(hub): State<Hub>,
) -> impl IntoResponse {
    hub.pages
        .lock()
        .unwrap()
        .push(query.get("pageId").cloned().unwrap_or_default());
    let n = hub.connections.fetch_add(1, Ordering::SeqCst) + 1;
    ws.on_upgrade(move |socket| serve(socket, hub, n))
}

async fn serve(mut socket: WebSocket, hub: Hub, n: usize) {
    if socket
        .send(Message::Text(event_json(n).to_string().into()))
        .await
        .is_err()
    {
        return;
    }
    if hub.drop_first && n == 1 {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    if hub.send_garbage {
        let _ = socket.send(Message::Text("not json".into())).await;
        let _ = socket
            .send(Message::Text(event_json(100).to_string().into()))
            .await;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let _ = hub.received.send(text.as_str().to_string());
        }
    }
}

/// Start a WS server, return (ws URL, hub, frames the server received).
async fn start_server(
    drop_first: bool,
    send_garbage: bool,
) -> (String, Hub, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hub = Hub {
        connections: Arc::new(AtomicUsize::new(0)),
        pages: Arc::new(Mutex::new(Vec::new())),
        received: tx,
        drop_first,
        send_garbage,
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(hub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("ws://127.0.0.1:{port}/ws"), hub, rx)
}

fn config(url: &str, max_attempts: u32) -> LiveConfig {
    let mut config = LiveConfig::new(url).unwrap();
    config.reconnect = ReconnectPolicy {
        max_attempts,
        delay: Duration::from_millis(20),
    };
    config
}

async fn wait_for(mut state: watch::Receiver<ConnectionState>, want: ConnectionState) {
    state
        .wait_for(|s| *s == want)
        .await
        .expect("connection task ended first");
}

#[tokio::test]
async fn receives_events_and_drops_garbage() {
    timeout(TEST_TIMEOUT, async {
        let (url, hub, _rx) = start_server(false, true).await;
        let (socket, mut events) = LiveSocket::connect(&config(&url, 5), PAGE).unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.kind, LiveEventKind::Message);
        assert_eq!(first.data["n"], 1);

        // "not json" is skipped; the next frame still arrives.
        let second = events.recv().await.unwrap();
        assert_eq!(second.data["n"], 100);

        assert_eq!(socket.state(), ConnectionState::Connected);
        assert_eq!(hub.pages.lock().unwrap().as_slice(), [PAGE.to_string()]);
        socket.close().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    timeout(TEST_TIMEOUT, async {
        let (url, hub, _rx) = start_server(true, false).await;
        let (socket, mut events) = LiveSocket::connect(&config(&url, 5), PAGE).unwrap();

        assert_eq!(events.recv().await.unwrap().data["n"], 1);
        // Second connection greets with n = 2.
        assert_eq!(events.recv().await.unwrap().data["n"], 2);
        assert_eq!(hub.connections.load(Ordering::SeqCst), 2);

        wait_for(socket.watch_state(), ConnectionState::Connected).await;
        socket.close().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn gives_up_when_server_unreachable() {
    timeout(TEST_TIMEOUT, async {
        // Reserve a port, then free it so connections are refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("ws://127.0.0.1:{port}/ws");
        let (socket, mut events) = LiveSocket::connect(&config(&url, 2), PAGE).unwrap();
        let state = socket.watch_state();

        // The task ends after the retries are spent, closing the event channel.
        assert!(events.recv().await.is_none());
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
        socket.close().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_reaches_server() {
    timeout(TEST_TIMEOUT, async {
        let (url, _hub, mut received) = start_server(false, false).await;
        let (socket, _events) = LiveSocket::connect(&config(&url, 5), PAGE).unwrap();
        wait_for(socket.watch_state(), ConnectionState::Connected).await;

        let payload = json!({"type": "typing", "senderId": "519"});
        socket.send(&payload).await.unwrap();

        let text = received.recv().await.unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), payload);
        socket.close().await;
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn explicit_close_does_not_reconnect() {
    timeout(TEST_TIMEOUT, async {
        let (url, hub, _rx) = start_server(false, false).await;
        let (socket, _events) = LiveSocket::connect(&config(&url, 5), PAGE).unwrap();
        let state = socket.watch_state();
        wait_for(state.clone(), ConnectionState::Connected).await;

        socket.close().await;
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hub.connections.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn close_cancels_pending_handshake() {
    timeout(TEST_TIMEOUT, async {
        // Accept TCP connections but never answer the upgrade request.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (accepted_tx, mut accepted) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
                let _ = accepted_tx.send(());
            }
        });

        let url = format!("ws://127.0.0.1:{port}/ws");
        let (socket, _events) = LiveSocket::connect(&config(&url, 5), PAGE).unwrap();
        let state = socket.watch_state();
        accepted.recv().await.unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Connecting);

        timeout(Duration::from_millis(500), socket.close())
            .await
            .expect("close waited on the handshake");
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_page_id_refuses_to_connect() {
    let result = LiveSocket::connect(&config("ws://127.0.0.1:1/ws", 5), "");
    assert!(matches!(result, Err(LiveError::MissingPageId)));
}
