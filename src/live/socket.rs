//! WebSocket client for live chat events.
//!
//! The connection runs as a spawned task driven by [`Reconnector`]. The owner
//! receives decoded events on an mpsc channel, watches the connection state,
//! and sends outbound payloads through a command channel.

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use super::model::LiveEvent;
use super::reconnect::{ConnectionEvent, ConnectionState, Directive, Reconnector};
use crate::config::{LiveConfig, ReconnectPolicy};
use crate::error::LiveError;

const CHANNEL_CAPACITY: usize = 256;

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Command {
    Send(String),
    Close,
}

/// How a connected session ended.
enum Exit {
    Dropped,
    Closed,
}

/// Handle to the background live connection.
pub struct LiveSocket {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl LiveSocket {
    /// Spawn the connection task for `page_id`. Must be called inside a tokio runtime.
    pub fn connect(
        config: &LiveConfig,
        page_id: &str,
    ) -> Result<(Self, mpsc::Receiver<LiveEvent>), LiveError> {
        let url = socket_url(&config.url, page_id)?;

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        info!(url = %url, "Starting live connection");
        let task = tokio::spawn(run(url, config.reconnect, event_tx, command_rx, state_tx));

        Ok((
            Self {
                commands: command_tx,
                state: state_rx,
                task,
            },
            event_rx,
        ))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Send a JSON payload. Dropped with a warning when not connected.
    pub async fn send(&self, payload: &serde_json::Value) -> Result<(), LiveError> {
        if !self.state().is_connected() {
            warn!(state = %self.state(), "Live socket not connected, message dropped");
            return Ok(());
        }
        self.commands
            .send(Command::Send(payload.to_string()))
            .await
            .map_err(|_| LiveError::Stopped)
    }

    /// Close the connection without retrying and wait for the task to finish.
    pub async fn close(self) {
        let _ = self.commands.send(Command::Close).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Live connection task failed");
        }
    }
}

/// `<base>?pageId=<page_id>`, refusing empty page ids and non-websocket schemes.
pub fn socket_url(base: &Url, page_id: &str) -> Result<Url, LiveError> {
    if page_id.trim().is_empty() {
        return Err(LiveError::MissingPageId);
    }
    if !matches!(base.scheme(), "ws" | "wss") {
        return Err(LiveError::InvalidUrl {
            url: base.to_string(),
            reason: format!("unsupported scheme '{}'", base.scheme()),
        });
    }
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("pageId", page_id);
    Ok(url)
}

async fn run(
    url: Url,
    policy: ReconnectPolicy,
    events: mpsc::Sender<LiveEvent>,
    mut commands: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
) {
    let mut machine = Reconnector::new(policy);
    let mut directive = machine.handle(ConnectionEvent::Connect);
    state.send_replace(machine.state());

    loop {
        directive = match directive {
            Directive::Open => {
                let attempt = tokio::select! {
                    result = connect_async(url.as_str()) => Some(result),
                    _ = until_close(&mut commands) => None,
                };
                match attempt {
                    Some(Ok((stream, _))) => {
                        machine.handle(ConnectionEvent::Opened);
                        state.send_replace(machine.state());
                        info!("Live connection open");

                        match pump(stream, &events, &mut commands).await {
                            Exit::Dropped => {
                                warn!("Live connection dropped");
                                machine.handle(ConnectionEvent::Dropped)
                            }
                            Exit::Closed => machine.handle(ConnectionEvent::CloseRequested),
                        }
                    }
                    Some(Err(e)) => {
                        warn!(attempt = machine.attempts() + 1, error = %e, "Live connection failed");
                        machine.handle(ConnectionEvent::Failed)
                    }
                    None => {
                        debug!("Close requested while connecting");
                        machine.handle(ConnectionEvent::CloseRequested)
                    }
                }
            }
            Directive::Wait(delay) => {
                debug!(?delay, state = %machine.state(), "Waiting before reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => machine.handle(ConnectionEvent::RetryElapsed),
                    _ = until_close(&mut commands) => {
                        machine.handle(ConnectionEvent::CloseRequested)
                    }
                }
            }
            Directive::GiveUp => {
                warn!(attempts = machine.attempts(), "Giving up on live connection");
                break;
            }
            Directive::Close | Directive::Idle => break,
        };
        state.send_replace(machine.state());
    }

    state.send_replace(machine.state());
    info!("Live connection stopped");
}

/// Wait for a close request while no socket is open, dropping sends.
async fn until_close(commands: &mut mpsc::Receiver<Command>) {
    loop {
        match commands.recv().await {
            Some(Command::Send(_)) => warn!("Live socket not connected, message dropped"),
            Some(Command::Close) | None => return,
        }
    }
}

/// Shuttle frames until the socket drops or the owner closes it.
async fn pump(
    stream: Stream,
    events: &mpsc::Sender<LiveEvent>,
    commands: &mut mpsc::Receiver<Command>,
) -> Exit {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    match serde_json::from_str::<LiveEvent>(text.as_str()) {
                        Ok(event) => {
                            if events.send(event).await.is_err() {
                                debug!("Event receiver gone, closing");
                                let _ = sink.close().await;
                                return Exit::Closed;
                            }
                        }
                        Err(e) => warn!(error = %e, "Undecodable live frame dropped"),
                    }
                }
                Some(Ok(Frame::Close(_))) | None => return Exit::Dropped,
                Some(Err(e)) => {
                    warn!(error = %e, "Live socket error");
                    return Exit::Dropped;
                }
                Some(Ok(_)) => {}
            },
            cmd = commands.recv() => match cmd {
                Some(Command::Send(text)) => {
                    if let Err(e) = sink.send(Frame::Text(text.into())).await {
                        warn!(error = %e, "Live send failed");
                        return Exit::Dropped;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Frame::Close(None)).await;
                    return Exit::Closed;
                }
            },
        }
    }
}
